use std::time::{Duration, Instant};

use crate::command::DroneCommand;

/// Yaw rate used while sweeping for a target, in rc units (10-100).
pub const SCAN_VELOCITY: i8 = 100;

/// Minimum time between battery queries.
pub const TIME_BETWEEN_BATTERY_CHECKS: Duration = Duration::from_millis(500);

const RC_MIN: i8 = -100;
const RC_MAX: i8 = 100;

/// Control-loop state: the four rc velocities, the target flag and the
/// cached battery level.
#[derive(Debug)]
pub struct Pilot {
    left_right: i8,
    forward_backward: i8,
    up_down: i8,
    yaw: i8,
    has_target: bool,
    battery_level: u8,
    last_battery_check: Option<Instant>,
}

impl Pilot {
    pub fn new() -> Self {
        Self {
            left_right: 0,
            forward_backward: 0,
            up_down: 0,
            yaw: 0,
            has_target: false,
            battery_level: 0,
            last_battery_check: None,
        }
    }

    /// The current setpoint in SDK axis order.
    pub fn velocities(&self) -> (i8, i8, i8, i8) {
        (self.left_right, self.forward_backward, self.up_down, self.yaw)
    }

    /// Sets all four axes at once, clamped to the rc range.
    pub fn set_velocities(&mut self, left_right: i8, forward_backward: i8, up_down: i8, yaw: i8) {
        self.left_right = left_right.clamp(RC_MIN, RC_MAX);
        self.forward_backward = forward_backward.clamp(RC_MIN, RC_MAX);
        self.up_down = up_down.clamp(RC_MIN, RC_MAX);
        self.yaw = yaw.clamp(RC_MIN, RC_MAX);
    }

    /// Freeze in place.
    pub fn stop_moving(&mut self) {
        self.set_velocities(0, 0, 0, 0);
    }

    /// Yaw on the spot to look around for a target.
    pub fn scan_surroundings(&mut self) {
        self.yaw = SCAN_VELOCITY;
    }

    /// Looks for a target in the scene. No tracker is wired up yet, so
    /// this always fails.
    pub fn find_target(&mut self) -> bool {
        self.has_target = false;
        self.has_target
    }

    pub fn has_target(&self) -> bool {
        self.has_target
    }

    /// Snapshots the current setpoint as a command for the link.
    pub fn rc_command(&self) -> DroneCommand {
        DroneCommand::RemoteControl {
            left_right: self.left_right,
            forward_backward: self.forward_backward,
            up_down: self.up_down,
            yaw: self.yaw,
        }
    }

    /// True once the configured interval has passed since the last
    /// recorded battery reading. A fresh pilot is always due.
    pub fn battery_check_due(&self, now: Instant) -> bool {
        match self.last_battery_check {
            Some(at) => now.duration_since(at) >= TIME_BETWEEN_BATTERY_CHECKS,
            None => true,
        }
    }

    pub fn record_battery(&mut self, level: u8, now: Instant) {
        self.battery_level = level;
        self.last_battery_check = Some(now);
    }

    pub fn battery_level(&self) -> u8 {
        self.battery_level
    }
}

impl Default for Pilot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_moving_zeroes_all_velocities() {
        let mut pilot = Pilot::new();
        pilot.set_velocities(10, -20, 30, -40);
        pilot.stop_moving();
        assert_eq!(pilot.velocities(), (0, 0, 0, 0));
    }

    #[test]
    fn velocities_clamp_to_rc_range() {
        let mut pilot = Pilot::new();
        pilot.set_velocities(i8::MAX, i8::MIN, 101, -101);
        assert_eq!(pilot.velocities(), (100, -100, 100, -100));
    }

    #[test]
    fn scan_only_touches_yaw() {
        let mut pilot = Pilot::new();
        pilot.set_velocities(5, 6, 7, 0);
        pilot.scan_surroundings();
        assert_eq!(pilot.velocities(), (5, 6, 7, SCAN_VELOCITY));
    }

    #[test]
    fn target_search_always_fails() {
        let mut pilot = Pilot::new();
        assert!(!pilot.find_target());
        assert!(!pilot.has_target());
    }

    #[test]
    fn battery_check_waits_for_the_interval() {
        let mut pilot = Pilot::new();
        let t0 = Instant::now();

        assert!(pilot.battery_check_due(t0));

        pilot.record_battery(80, t0);
        assert_eq!(pilot.battery_level(), 80);
        assert!(!pilot.battery_check_due(t0));
        assert!(!pilot.battery_check_due(t0 + Duration::from_millis(499)));
        assert!(pilot.battery_check_due(t0 + TIME_BETWEEN_BATTERY_CHECKS));
    }

    #[test]
    fn recording_a_reading_resets_the_timer() {
        let mut pilot = Pilot::new();
        let t0 = Instant::now();
        pilot.record_battery(80, t0);

        let t1 = t0 + TIME_BETWEEN_BATTERY_CHECKS;
        pilot.record_battery(79, t1);
        assert!(!pilot.battery_check_due(t1 + Duration::from_millis(100)));
        assert!(pilot.battery_check_due(t1 + TIME_BETWEEN_BATTERY_CHECKS));
    }

    #[test]
    fn rc_command_snapshots_the_setpoint() {
        let mut pilot = Pilot::new();
        pilot.set_velocities(1, 2, 3, 4);
        assert_eq!(
            pilot.rc_command(),
            DroneCommand::RemoteControl { left_right: 1, forward_backward: 2, up_down: 3, yaw: 4 }
        );
    }
}
