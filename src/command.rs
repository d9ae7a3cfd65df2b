use tokio::sync::mpsc;

/// Commands the control loop can issue to the drone link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DroneCommand {
    TakeOff,
    Land,
    StopAndHover,
    EmergencyStop,
    RemoteControl { left_right: i8, forward_backward: i8, up_down: i8, yaw: i8 },
    QueryBattery,
}

pub type DroneCommandSender = mpsc::UnboundedSender<DroneCommand>;
pub type DroneCommandReceiver = mpsc::UnboundedReceiver<DroneCommand>;

pub fn make_drone_command_channel() -> (DroneCommandSender, DroneCommandReceiver) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_channel_delivers_in_order() {
        let (tx, mut rx) = make_drone_command_channel();
        tx.send(DroneCommand::TakeOff).unwrap();
        tx.send(DroneCommand::Land).unwrap();
        assert_eq!(rx.try_recv().unwrap(), DroneCommand::TakeOff);
        assert_eq!(rx.try_recv().unwrap(), DroneCommand::Land);
        assert!(rx.try_recv().is_err());
    }
}
