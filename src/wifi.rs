use std::process::Command;

use tokio::time::{sleep, Duration};

use crate::{Result, TelloError};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

//////////////////////////////////////////////////////////////////////////////
// macOS

#[cfg(target_os = "macos")]
fn list_wifi_devices() -> Result<Vec<String>> {
    let output = run_command("networksetup", &["-listallhardwareports"])?;

    // a "Hardware Port: Wi-Fi" line is followed by one like "Device: en1"
    let mut found_wifi = false;
    let mut devices: Vec<String> = vec![];
    for line in output.lines() {
        if found_wifi {
            found_wifi = false;
            devices.push(line.trim_start_matches("Device: ").to_string());
        } else if line.contains("Wi-Fi") {
            found_wifi = true;
        }
    }

    Ok(devices)
}

#[cfg(target_os = "macos")]
pub async fn wait_for_wifi(ssid_prefix: &str) -> Result<()> {
    let devices = list_wifi_devices()?;

    // wait for any one of them to join the drone's network
    let waiting_for = format!("Current Wi-Fi Network: {ssid_prefix}");
    loop {
        for device in devices.iter() {
            let s = run_command("networksetup", &["-getairportnetwork", device])?;
            if s.starts_with(&waiting_for) {
                return Ok(());
            }
        }
        sleep(POLL_INTERVAL).await;
    }
}

//////////////////////////////////////////////////////////////////////////////
// linux

#[cfg(target_os = "linux")]
pub async fn wait_for_wifi(ssid_prefix: &str) -> Result<()> {
    loop {
        let s = run_command("iwgetid", &["-r"])?;
        if s.starts_with(ssid_prefix) {
            return Ok(());
        }
        sleep(POLL_INTERVAL).await;
    }
}

//////////////////////////////////////////////////////////////////////////////
// anything else

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
pub async fn wait_for_wifi(_ssid_prefix: &str) -> Result<()> {
    log::warn!("wait_for_wifi is not implemented for this OS, assuming joined already and continuing");
    Ok(())
}

//////////////////////////////////////////////////////////////////////////////

fn run_command(cmd: &str, args: &[&str]) -> Result<String> {
    let raw_output = Command::new(cmd)
        .args(args)
        .output()
        .map_err(|err| TelloError::Generic { msg: format!("failed to run {cmd} - {err}") })?;

    String::from_utf8(raw_output.stdout)
        .map_err(|err| TelloError::Generic { msg: format!("failed to decode {cmd} output - {err:?}") })
}
