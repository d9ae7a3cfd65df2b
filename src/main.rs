//////////////////////////////////////////////////////////////////////////////
//
// Keyboard-piloted Tello with live video and a battery overlay.
//
//  Controls:
//  - 't': take off
//  - 'l': land
//  - Esc: stop and exit
//
// While no key is pressed and no target has been found the drone yaws on
// the spot, scanning its surroundings. Target detection is a placeholder
// and never finds anything.
//
//////////////////////////////////////////////////////////////////////////////

use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use log::{error, info, warn};

use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::{Color, PixelFormatEnum};
use sdl2::rect::Rect;

use openh264::decoder::Decoder;
use openh264::formats::YUVSource;

use tello_pilot::{
    BatteryLevelReceiver, DroneCommand, DroneCommandSender, Pilot, Result, Tello, TelloOptions,
    TelloVideoReceiver, VIDEO_HEIGHT, VIDEO_WIDTH,
};

/// Frames per second of the display window.
const FPS: u64 = 25;
const FRAME_INTERVAL: Duration = Duration::from_millis(1000 / FPS);

/// Speed for non-rc movement commands, in cm/s (10-100).
const INITIAL_SPEED: u8 = 20;

/// How long to wait for the link to land the drone and close down.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(20);

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut options = TelloOptions::default();

    // we want video, commands and the battery level...
    let video_receiver = options.with_video();
    let command_sender = options.with_command();
    let battery_receiver = options.with_battery();

    // run async Tokio runtime in a thread...
    let (done_sender, done_receiver) = mpsc::channel();
    std::thread::spawn(move || {
        let tokio_runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .expect("failed to build tokio runtime");

        tokio_runtime.block_on(async {
            if let Err(err) = fly(options).await {
                error!("drone link failed: {err}");
                std::process::exit(1);
            }
        });

        let _ = done_sender.send(());
    });

    // ...because SDL must run on the main thread
    run_gui(video_receiver, command_sender, battery_receiver).map_err(|msg| anyhow!(msg))?;

    // dropping the command sender above tells the link to land and close;
    // give it a chance to finish
    if done_receiver.recv_timeout(SHUTDOWN_GRACE).is_err() {
        warn!("timed out waiting for the drone to shut down");
    }

    Ok(())
}

async fn fly(options: TelloOptions) -> Result<()> {
    let drone = Tello::new().wait_for_wifi().await?;

    let drone = drone.connect_with(options).await?;

    match drone.set_speed(INITIAL_SPEED).await {
        Ok(_) => info!("speed set to {INITIAL_SPEED} cm/s"),
        Err(err) => warn!("failed to set initial speed: {err}"),
    }

    // reset any stale stream before starting our own
    if let Err(err) = drone.stop_video().await {
        warn!("streamoff before streamon failed: {err}");
    }
    drone.start_video().await?;

    let battery = drone.query_battery().await?;
    info!("battery at {battery}%");

    drone.stop_and_hover().await?;
    info!("all velocities initialized to 0");

    drone.handle_commands().await
}

fn run_gui(
    mut video_receiver: TelloVideoReceiver,
    command_sender: DroneCommandSender,
    battery_receiver: BatteryLevelReceiver,
) -> std::result::Result<(), String> {
    let sdl_context = sdl2::init()?;
    let video_subsystem = sdl_context.video()?;

    let window = video_subsystem
        .window("tello-pilot", VIDEO_WIDTH, VIDEO_HEIGHT)
        .position_centered()
        .opengl()
        .build()
        .map_err(|e| e.to_string())?;

    let mut canvas = window.into_canvas().build().map_err(|e| e.to_string())?;
    let texture_creator = canvas.texture_creator();

    let mut texture = texture_creator
        .create_texture_streaming(PixelFormatEnum::IYUV, VIDEO_WIDTH, VIDEO_HEIGHT)
        .map_err(|e| e.to_string())?;

    canvas.clear();
    canvas.present();

    let mut event_pump = sdl_context.event_pump()?;
    let mut decoder = Decoder::new().map_err(|e| e.to_string())?;
    let mut pilot = Pilot::new();

    'running: loop {
        // the link only applies setpoints while flying
        if command_sender.send(pilot.rc_command()).is_err() {
            info!("drone link gone");
            break 'running;
        }

        // wait for next encoded frame of video
        let Some(frame) = video_receiver.blocking_recv() else {
            info!("VIDEO END");
            break 'running;
        };

        let mut key_pressed = false;
        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown { keycode: Some(Keycode::Escape), .. } => {
                    warn!("stopping drone...");
                    break 'running;
                }

                // key repeats are ignored so each press acts exactly once
                Event::KeyDown { keycode: Some(Keycode::T), repeat: false, .. } => {
                    key_pressed = true;
                    command_sender
                        .send(DroneCommand::TakeOff)
                        .map_err(|e| e.to_string())?;
                }

                Event::KeyDown { keycode: Some(Keycode::L), repeat: false, .. } => {
                    key_pressed = true;
                    pilot.stop_moving();
                    command_sender
                        .send(DroneCommand::Land)
                        .map_err(|e| e.to_string())?;
                }

                _ => {}
            }
        }

        // nothing pressed and nothing found, keep looking around
        if !key_pressed && !pilot.find_target() {
            pilot.scan_surroundings();
        }

        let now = Instant::now();
        if pilot.battery_check_due(now) {
            command_sender
                .send(DroneCommand::QueryBattery)
                .map_err(|e| e.to_string())?;
            pilot.record_battery(*battery_receiver.borrow(), now);
        }

        // decode h264 to YUV and draw
        match decoder.decode(&frame.data) {
            Ok(Some(yuv)) => {
                texture
                    .update_yuv(
                        None,
                        yuv.y(),
                        yuv.y_stride() as usize,
                        yuv.u(),
                        yuv.u_stride() as usize,
                        yuv.v(),
                        yuv.v_stride() as usize,
                    )
                    .map_err(|e| e.to_string())?;

                canvas.copy(&texture, None, Some(Rect::new(0, 0, VIDEO_WIDTH, VIDEO_HEIGHT)))?;
                draw_battery_gauge(&mut canvas, pilot.battery_level())?;
                canvas
                    .window_mut()
                    .set_title(&format!("tello-pilot - battery {}%", pilot.battery_level()))
                    .map_err(|e| e.to_string())?;
                canvas.present();
            }
            Ok(None) => {
                info!("incomplete frame, dropped");
            }
            Err(err) => {
                warn!("h264 decoder error: {err}");
            }
        }

        std::thread::sleep(FRAME_INTERVAL);
    }

    Ok(())
}

//////////////////////////////////////////////////////////////////////////////

const GAUGE_X: i32 = 32;
const GAUGE_Y: i32 = 664;
const GAUGE_WIDTH: u32 = 160;
const GAUGE_HEIGHT: u32 = 24;

/// Battery gauge in the bottom-left corner, green through red.
fn draw_battery_gauge(
    canvas: &mut sdl2::render::WindowCanvas,
    level: u8,
) -> std::result::Result<(), String> {
    let level = level.min(100);

    let fill_color = if level >= 40 {
        Color::RGB(0, 200, 0)
    } else if level >= 15 {
        Color::RGB(230, 180, 0)
    } else {
        Color::RGB(220, 0, 0)
    };

    let fill_width = GAUGE_WIDTH * u32::from(level) / 100;
    if fill_width > 0 {
        canvas.set_draw_color(fill_color);
        canvas.fill_rect(Rect::new(GAUGE_X, GAUGE_Y, fill_width, GAUGE_HEIGHT))?;
    }

    canvas.set_draw_color(Color::RGB(255, 255, 255));
    canvas.draw_rect(Rect::new(GAUGE_X, GAUGE_Y, GAUGE_WIDTH, GAUGE_HEIGHT))?;

    Ok(())
}
