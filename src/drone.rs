use log::{debug, error, info, trace, warn};
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout, Duration};

use crate::command::{DroneCommand, DroneCommandReceiver};
use crate::errors::{Result, TelloError};
use crate::options::{BatteryLevelSender, TelloOptions};
use crate::state::StateListener;
use crate::video::VideoListener;

const DEFAULT_DRONE_HOST: &str = "192.168.10.1";

const CONTROL_UDP_PORT: u32 = 8889;

const WIFI_SSID_PREFIX: &str = "TELLO";

const RESPONSE_TIMEOUT: Duration = Duration::from_secs(7);
const CONNECT_ATTEMPTS: u32 = 10;

// the drone accepts speeds between 10 and 100 cm/s
const MIN_SPEED: u8 = 10;
const MAX_SPEED: u8 = 100;

// connection states
#[derive(Debug)]
pub struct NoWifi;

#[derive(Debug)]
pub struct Disconnected;

#[derive(Debug)]
pub struct Connected {
    sock: UdpSocket,
    is_flying: bool,
    state_listener: Option<StateListener>,
    video_listener: Option<VideoListener>,
    command_receiver: Option<DroneCommandReceiver>,
    battery_sender: Option<BatteryLevelSender>,
}

/// The drone control link, typed by connection state. Flight operations
/// only exist once connected.
#[derive(Debug)]
pub struct Tello<S = NoWifi> {
    state: S,
}

impl Tello<NoWifi> {
    pub fn new() -> Self {
        Self { state: NoWifi }
    }

    /// Waits until the machine has joined the drone's own WiFi network.
    pub async fn wait_for_wifi(&self) -> Result<Tello<Disconnected>> {
        info!("waiting for WiFi...");
        crate::wifi::wait_for_wifi(WIFI_SSID_PREFIX).await?;
        Ok(Tello { state: Disconnected })
    }
}

impl Default for Tello<NoWifi> {
    fn default() -> Self {
        Self::new()
    }
}

impl Tello<Disconnected> {
    pub async fn connect(&self) -> Result<Tello<Connected>> {
        self.connect_with(TelloOptions::default()).await
    }

    /// Binds the control socket, puts the drone in SDK command mode and
    /// starts whichever listeners the options asked for.
    pub async fn connect_with(&self, mut options: TelloOptions) -> Result<Tello<Connected>> {
        let local_address = format!("0.0.0.0:{CONTROL_UDP_PORT}");

        let drone_host = DEFAULT_DRONE_HOST;
        let drone_address = format!("{drone_host}:{CONTROL_UDP_PORT}");

        info!("CONNECT {local_address} -> {drone_address}");

        debug!("binding local {local_address}...");
        let sock = UdpSocket::bind(&local_address).await?;

        debug!("connecting to drone at {drone_address}...");
        let mut attempt = 0;
        loop {
            attempt += 1;
            match sock.connect(&drone_address).await {
                Ok(_) => break,
                Err(err) if attempt < CONNECT_ATTEMPTS => {
                    warn!("connection attempt #{attempt} failed ({err}), retrying...");
                    sleep(Duration::from_millis(100)).await;
                }
                Err(err) => return Err(err.into()),
            }
        }

        let state_listener = match options.state_sender.take() {
            Some(sender) => Some(StateListener::start_listening(sender).await?),
            None => None,
        };

        let video_listener = match options.video_sender.take() {
            Some(sender) => Some(VideoListener::start_listening(sender).await?),
            None => None,
        };

        let drone = Tello {
            state: Connected {
                sock,
                is_flying: false,
                state_listener,
                video_listener,
                command_receiver: options.command_receiver.take(),
                battery_sender: options.battery_sender.take(),
            },
        };

        debug!("putting drone in command mode...");
        drone.send_expect_ok("command").await?;

        info!("CONNECTED");

        Ok(drone)
    }
}

impl Tello<Connected> {
    /// Sends one SDK command and waits for the textual reply.
    pub async fn send(&self, msg: &str) -> Result<String> {
        debug!("SEND {msg}");
        let sock = &self.state.sock;
        sock.send(msg.as_bytes()).await?;

        let mut buf = vec![0; 256];
        let n = timeout(RESPONSE_TIMEOUT, sock.recv(&mut buf))
            .await
            .map_err(|_| TelloError::Timeout { command: msg.to_string() })??;
        buf.truncate(n);

        let reply = String::from_utf8(buf)?.trim().to_string();
        debug!("RECEIVED {reply}");

        Ok(reply)
    }

    /// Sends a command whose only acceptable reply is `ok`.
    pub async fn send_expect_ok(&self, msg: &str) -> Result<()> {
        let reply = self.send(msg).await?;
        if reply == "ok" {
            Ok(())
        } else {
            Err(TelloError::CommandFailed { command: msg.to_string(), reply })
        }
    }

    pub fn is_flying(&self) -> bool {
        self.state.is_flying
    }

    pub async fn take_off(&mut self) -> Result<()> {
        warn!("drone taking off...");
        self.send_expect_ok("takeoff").await?;
        self.state.is_flying = true;
        Ok(())
    }

    pub async fn land(&mut self) -> Result<()> {
        warn!("landing drone...");
        self.send_expect_ok("land").await?;
        self.state.is_flying = false;
        Ok(())
    }

    /// Stops the motors immediately. The drone will drop like a brick.
    pub async fn emergency_stop(&mut self) -> Result<()> {
        warn!("EMERGENCY STOP");
        self.send_expect_ok("emergency").await?;
        self.state.is_flying = false;
        Ok(())
    }

    /// Sets the speed used by non-rc movement commands, in cm/s.
    pub async fn set_speed(&self, speed: u8) -> Result<()> {
        let speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        self.send_expect_ok(&format!("speed {speed}")).await
    }

    /// Sends a four-axis `rc` setpoint. Fire and forget, the drone does
    /// not reply to rc commands.
    pub async fn remote_control(
        &self,
        left_right: i8,
        forward_backward: i8,
        up_down: i8,
        yaw: i8,
    ) -> Result<()> {
        let msg = format_rc(left_right, forward_backward, up_down, yaw);
        trace!("SEND {msg}");
        self.state.sock.send(msg.as_bytes()).await?;
        Ok(())
    }

    /// Zeroes all four axes, freezing the drone in place.
    pub async fn stop_and_hover(&self) -> Result<()> {
        self.remote_control(0, 0, 0, 0).await
    }

    pub async fn query_battery(&self) -> Result<u8> {
        let reply = self.send("battery?").await?;
        parse_battery(&reply)
    }

    pub async fn start_video(&self) -> Result<()> {
        self.send_expect_ok("streamon").await
    }

    pub async fn stop_video(&self) -> Result<()> {
        self.send_expect_ok("streamoff").await
    }

    /// Drains the command channel requested via
    /// [`TelloOptions::with_command`], applying each command to the link.
    /// Individual command failures are logged and the loop carries on.
    /// When the sender closes the drone is shut down best-effort.
    pub async fn handle_commands(mut self) -> Result<()> {
        let mut receiver = self.state.command_receiver.take().ok_or_else(|| {
            TelloError::Generic { msg: "no command channel, use TelloOptions::with_command".to_string() }
        })?;

        while let Some(command) = receiver.recv().await {
            if let Err(err) = self.apply(command).await {
                error!("command {command:?} failed: {err}");
            }
        }

        self.shut_down().await;
        Ok(())
    }

    async fn apply(&mut self, command: DroneCommand) -> Result<()> {
        match command {
            DroneCommand::TakeOff => self.take_off().await,
            DroneCommand::Land => {
                self.stop_and_hover().await?;
                self.land().await
            }
            DroneCommand::StopAndHover => self.stop_and_hover().await,
            DroneCommand::EmergencyStop => self.emergency_stop().await,
            DroneCommand::RemoteControl { left_right, forward_backward, up_down, yaw } => {
                // setpoints only apply in the air
                if self.state.is_flying {
                    self.remote_control(left_right, forward_backward, up_down, yaw).await
                } else {
                    Ok(())
                }
            }
            DroneCommand::QueryBattery => self.refresh_battery().await,
        }
    }

    async fn refresh_battery(&self) -> Result<()> {
        let level = self.query_battery().await?;
        if let Some(sender) = &self.state.battery_sender {
            let _ = sender.send(level);
        }
        Ok(())
    }

    /// Best-effort shutdown: freeze, close the stream, land if still in
    /// the air, stop the listeners. Failures are logged and swallowed.
    pub async fn shut_down(mut self) {
        info!("shutting down...");

        if let Err(err) = self.stop_and_hover().await {
            warn!("failed to zero velocities: {err}");
        }
        if let Err(err) = self.stop_video().await {
            warn!("failed to close video stream: {err}");
        }
        if self.state.is_flying {
            if let Err(err) = self.land().await {
                warn!("failed to land: {err}");
            }
        }

        if let Some(listener) = &self.state.video_listener {
            listener.stop_listening();
        }
        if let Some(listener) = &self.state.state_listener {
            listener.stop_listening();
        }

        info!("DONE");
    }
}

fn format_rc(left_right: i8, forward_backward: i8, up_down: i8, yaw: i8) -> String {
    format!("rc {left_right} {forward_backward} {up_down} {yaw}")
}

fn parse_battery(reply: &str) -> Result<u8> {
    reply
        .trim()
        .parse::<u8>()
        .map_err(|_| TelloError::ParseError { msg: reply.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rc_payload_uses_sdk_axis_order() {
        assert_eq!(format_rc(1, -2, 3, -100), "rc 1 -2 3 -100");
    }

    #[test]
    fn battery_reply_parses_as_percentage() {
        assert_eq!(parse_battery("82").unwrap(), 82);
        assert_eq!(parse_battery("100\r\n").unwrap(), 100);
    }

    #[test]
    fn unexpected_battery_reply_is_an_error() {
        assert!(parse_battery("ok").is_err());
        assert!(parse_battery("error").is_err());
    }
}
