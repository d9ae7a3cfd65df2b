use log::{debug, warn};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::{spawn, task};

use crate::errors::{Result, TelloError};

const STATE_UDP_PORT: u32 = 8890;

pub type TelloStateSender = mpsc::UnboundedSender<TelloState>;
pub type TelloStateReceiver = mpsc::UnboundedReceiver<TelloState>;

pub fn make_tello_state_channel() -> (TelloStateSender, TelloStateReceiver) {
    mpsc::unbounded_channel()
}

/// The live state of the drone, as broadcast on the telemetry port.
#[derive(Debug, Default)]
pub struct TelloState {
    pub roll: i16,
    pub pitch: i16,
    pub yaw: i16,
    pub height: i16,
    pub barometer: f32,
    pub battery: u8,
    pub time_of_flight: u16,
    pub motor_time: u16,
    pub temperature_low: i16,
    pub temperature_high: i16,
    pub velocity: Vector3<i16>,
    pub acceleration: Vector3<f32>,
}

#[derive(Debug, Default)]
pub struct Vector3<T> {
    pub x: T,
    pub y: T,
    pub z: T,
}

impl TelloState {
    /// Parses a state string received from the drone.
    ///
    /// Example message:
    /// "mid:-1;x:-100;y:-100;z:-100;mpry:-1,-1,-1;pitch:0;roll:0;yaw:-3;vgx:0;vgy:0;vgz:1;templ:58;temph:60;tof:71;h:50;bat:82;baro:-57.14;time:14;agx:17.00;agy:-4.00;agz:-956.00;"
    ///
    /// Unknown keys are ignored so newer firmware can add fields freely.
    pub fn from_message(s: &str) -> Result<TelloState> {
        let mut state = TelloState::default();

        for field in s.split(';') {
            if field.is_empty() {
                continue;
            }

            let (k, v) = split_key_value(field)?;

            match k {
                "roll" => state.roll = value_as(v)?,
                "pitch" => state.pitch = value_as(v)?,
                "yaw" => state.yaw = value_as(v)?,
                "h" => state.height = value_as(v)?,
                "baro" => state.barometer = value_as(v)?,
                "bat" => state.battery = value_as(v)?,
                "tof" => state.time_of_flight = value_as(v)?,
                "time" => state.motor_time = value_as(v)?,
                "templ" => state.temperature_low = value_as(v)?,
                "temph" => state.temperature_high = value_as(v)?,
                "vgx" => state.velocity.x = value_as(v)?,
                "vgy" => state.velocity.y = value_as(v)?,
                "vgz" => state.velocity.z = value_as(v)?,
                "agx" => state.acceleration.x = value_as(v)?,
                "agy" => state.acceleration.y = value_as(v)?,
                "agz" => state.acceleration.z = value_as(v)?,
                _ => {}
            }
        }

        Ok(state)
    }
}

fn split_key_value(kv: &str) -> Result<(&str, &str)> {
    kv.split_once(':')
        .ok_or_else(|| TelloError::ParseError { msg: kv.to_string() })
}

fn value_as<T: std::str::FromStr>(s: &str) -> Result<T> {
    s.parse::<T>()
        .map_err(|_| TelloError::ParseError { msg: s.to_string() })
}

/// Background task receiving telemetry broadcasts and passing parsed
/// states down the channel.
#[derive(Debug)]
pub(crate) struct StateListener {
    task: task::JoinHandle<()>,
}

impl StateListener {
    pub(crate) async fn start_listening(sender: TelloStateSender) -> Result<Self> {
        let local_address = format!("0.0.0.0:{STATE_UDP_PORT}");
        debug!("state listener starting at {local_address}");

        let sock = UdpSocket::bind(&local_address).await?;

        let task = spawn(async move {
            let mut buf = vec![0; 1024];
            loop {
                let n = match sock.recv(&mut buf).await {
                    Ok(n) => n,
                    Err(err) => {
                        warn!("state receive failed: {err}");
                        break;
                    }
                };

                let raw = String::from_utf8_lossy(&buf[..n]);
                match TelloState::from_message(raw.trim()) {
                    Ok(state) => {
                        // receiver gone means nobody cares any more
                        if sender.send(state).is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!("bad state message: {err}"),
                }
            }
        });

        Ok(Self { task })
    }

    pub(crate) fn stop_listening(&self) {
        debug!("state listener stopping");
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = "mid:-1;x:-100;y:-100;z:-100;mpry:-1,-1,-1;pitch:0;roll:0;yaw:-3;vgx:0;vgy:0;vgz:1;templ:58;temph:60;tof:71;h:50;bat:82;baro:-57.14;time:14;agx:17.00;agy:-4.00;agz:-956.00;";

    #[test]
    fn parses_full_state_message() {
        let state = TelloState::from_message(EXAMPLE).unwrap();
        assert_eq!(state.battery, 82);
        assert_eq!(state.yaw, -3);
        assert_eq!(state.height, 50);
        assert_eq!(state.velocity.z, 1);
        assert_eq!(state.time_of_flight, 71);
        assert!((state.barometer + 57.14).abs() < 1e-3);
        assert!((state.acceleration.x - 17.0).abs() < 1e-3);
    }

    #[test]
    fn ignores_unknown_keys_and_trailing_separator() {
        let state = TelloState::from_message("mystery:42;bat:17;").unwrap();
        assert_eq!(state.battery, 17);
    }

    #[test]
    fn rejects_malformed_pair() {
        assert!(TelloState::from_message("bat82").is_err());
    }

    #[test]
    fn rejects_unparseable_value() {
        assert!(TelloState::from_message("bat:many;").is_err());
    }
}
