//! Control link and pilot state for flying a Tello drone from a keyboard.

mod command;
mod drone;
mod errors;
mod options;
mod pilot;
mod state;
mod video;
mod wifi;

pub use command::{make_drone_command_channel, DroneCommand, DroneCommandReceiver, DroneCommandSender};
pub use drone::Tello;
pub use errors::{Result, TelloError};
pub use options::{BatteryLevelReceiver, TelloOptions};
pub use pilot::{Pilot, SCAN_VELOCITY, TIME_BETWEEN_BATTERY_CHECKS};
pub use state::{make_tello_state_channel, TelloState, TelloStateReceiver, TelloStateSender, Vector3};
pub use video::{
    make_tello_video_channel, TelloVideoFrame, TelloVideoReceiver, TelloVideoSender, VIDEO_HEIGHT,
    VIDEO_WIDTH,
};
