use tokio::sync::watch;

use crate::command::*;
use crate::state::*;
use crate::video::*;

pub type BatteryLevelReceiver = watch::Receiver<u8>;
pub(crate) type BatteryLevelSender = watch::Sender<u8>;

/// Tello drone connection and other usage options.
#[derive(Default)]
pub struct TelloOptions {
    pub(crate) state_sender: Option<TelloStateSender>,
    pub(crate) video_sender: Option<TelloVideoSender>,
    pub(crate) command_receiver: Option<DroneCommandReceiver>,
    pub(crate) battery_sender: Option<BatteryLevelSender>,
}

impl TelloOptions {
    /// Request state updates from the drone.
    ///
    /// *nb* As messages are sent to the UDP broadcast address 0.0.0.0 this
    /// only works in AP mode, ie using the drone's own WiFi network
    ///
    /// Returns the receiver end of the channel used to pass on updates
    ///
    pub fn with_state(&mut self) -> TelloStateReceiver {
        let (tx, rx) = make_tello_state_channel();
        self.state_sender = Some(tx);
        rx
    }

    /// Request video from the drone as a stream of h264-encoded 720p YUV
    /// frames.
    ///
    /// *nb* As messages are sent to the UDP broadcast address 0.0.0.0 this
    /// only works in AP mode, ie using the drone's own WiFi network
    ///
    /// Returns the receiver end of the channel used to pass on frames
    ///
    pub fn with_video(&mut self) -> TelloVideoReceiver {
        let (tx, rx) = make_tello_video_channel();
        self.video_sender = Some(tx);
        rx
    }

    /// Returns the sender end of a channel for issuing commands to the
    /// drone, eg for a remote control application.
    ///
    pub fn with_command(&mut self) -> DroneCommandSender {
        let (tx, rx) = make_drone_command_channel();
        self.command_receiver = Some(rx);
        tx
    }

    /// Request the battery level as answered to `QueryBattery` commands.
    ///
    /// Returns a watch holding the most recent percentage, starting at 0.
    ///
    pub fn with_battery(&mut self) -> BatteryLevelReceiver {
        let (tx, rx) = watch::channel(0);
        self.battery_sender = Some(tx);
        rx
    }
}
