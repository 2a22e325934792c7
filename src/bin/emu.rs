use std::{ffi::OsString, path::PathBuf, sync::Arc, time::Instant};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use pixels::{Pixels, SurfaceTexture};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, KeyCode, NamedKey},
    window::{Window, WindowId},
};

use chip8_vm::{Chip8, Chip8Runner, DISPLAY_X, DISPLAY_Y, Framebuffer, Quirks, u4};

const PIXEL_ON: [u8; 4] = [0x33, 0xFF, 0x66, 0xFF];
const PIXEL_OFF: [u8; 4] = [0x10, 0x10, 0x10, 0xFF];

/// Mapping from physical keyboard keys to CHIP-8 hex keypad (0x0-0xF).
const KEY_MAP: [KeyCode; 16] = [
    KeyCode::KeyX,   // 0x00
    KeyCode::Digit1, // 0x01
    KeyCode::Digit2, // 0x02
    KeyCode::Digit3, // 0x03
    KeyCode::KeyQ,   // 0x04
    KeyCode::KeyW,   // 0x05
    KeyCode::KeyE,   // 0x06
    KeyCode::KeyA,   // 0x07
    KeyCode::KeyS,   // 0x08
    KeyCode::KeyD,   // 0x09
    KeyCode::KeyZ,   // 0x0A
    KeyCode::KeyC,   // 0x0B
    KeyCode::Digit4, // 0x0C
    KeyCode::KeyR,   // 0x0D
    KeyCode::KeyF,   // 0x0E
    KeyCode::KeyV,   // 0x0F
];

/// Flags that stand alone on the command line.
const SWITCHES: [&str; 9] = [
    "--shift",
    "--jumpWithOffset",
    "--loadIncrementIndex",
    "--storeIncrementIndex",
    "--indexOverflowFlag",
    "-h",
    "--help",
    "-V",
    "--version",
];

/// Flags followed by a value, either as the next argument or after `=`.
const VALUE_FLAGS: [&str; 4] = ["--preset", "--scale", "--debug", "-d"];

/// Window and pixel surface that the framebuffer is drawn into.
struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
}

impl Renderer {
    fn new(event_loop: &ActiveEventLoop, scale: u32) -> anyhow::Result<Self> {
        let window = {
            let size = LogicalSize::new(DISPLAY_X as u32 * scale, DISPLAY_Y as u32 * scale);
            let min_size = LogicalSize::new(DISPLAY_X as u32, DISPLAY_Y as u32);

            Arc::new(
                event_loop
                    .create_window(
                        Window::default_attributes()
                            .with_title("chip8-vm")
                            .with_inner_size(size)
                            .with_min_inner_size(min_size),
                    )
                    .context("Failed to create window")?,
            )
        };

        let pixels = {
            let window_size = window.inner_size();
            let surface_texture =
                SurfaceTexture::new(window_size.width, window_size.height, window.clone());

            Pixels::new(DISPLAY_X as u32, DISPLAY_Y as u32, surface_texture)
                .context("Failed to create pixels surface")?
        };

        window.request_redraw();
        Ok(Self { window, pixels })
    }

    /// Copies the framebuffer into the pixel surface and presents it.
    fn draw(&mut self, framebuffer: &Framebuffer) -> anyhow::Result<()> {
        let frame = self.pixels.frame_mut();
        for (pxl, &lit) in frame.chunks_exact_mut(4).zip(framebuffer.cells()) {
            pxl.copy_from_slice(if lit { &PIXEL_ON } else { &PIXEL_OFF });
        }

        self.pixels.render().context("Pixels render error")
    }

    fn resize(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        self.pixels
            .resize_surface(width, height)
            .context("Failed to resize pixels surface")
    }
}

struct App {
    renderer: Option<Renderer>,
    scale: u32,

    runner: Chip8Runner,
    /// Used for delta time calculation.
    last_frame_instant: Instant,
    beeping: bool,

    /// Stores the result of the application to be returned from main.
    exit_result: anyhow::Result<()>,
}

impl App {
    fn new(
        rom: &[u8],
        quirks: Quirks,
        updates_per_second: u32,
        scale: u32,
    ) -> anyhow::Result<Self> {
        let mut chip8 = Chip8::new();
        chip8
            .load(rom)
            .context("Failed to load ROM into CHIP-8 memory")?;
        let runner = Chip8Runner::new(chip8, quirks, updates_per_second);

        Ok(Self {
            renderer: None,
            scale,
            runner,
            last_frame_instant: Instant::now(),
            beeping: false,
            exit_result: Ok(()),
        })
    }

    fn try_resumed(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        if self.renderer.is_none() {
            self.renderer = Some(Renderer::new(event_loop, self.scale)?);
        }

        // Avoid large dt on first frame
        self.last_frame_instant = Instant::now();
        Ok(())
    }

    fn try_window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        event: WindowEvent,
    ) -> anyhow::Result<()> {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        ..
                    },
                ..
            } => {
                info!("Exit requested");
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size.width, size.height)?;
                }
            }

            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = (now - self.last_frame_instant).as_secs_f32();
                self.last_frame_instant = now;

                self.runner.update(dt).context("Chip8 execution error")?;

                let beeping = self.runner.should_beep();
                if beeping != self.beeping {
                    debug!("Sound timer {}", if beeping { "active" } else { "expired" });
                    self.beeping = beeping;
                }

                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.draw(self.runner.framebuffer())?;
                    renderer.window.request_redraw();
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let Some(key) = KEY_MAP.iter().position(|&k| k == event.physical_key) {
                    let pressed = event.state == ElementState::Pressed;
                    self.runner.set_key(u4::new(key as u8), pressed);
                }
            }

            _ => (),
        }
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(e) = self.try_resumed(event_loop) {
            self.exit_result = Err(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Err(e) = self.try_window_event(event_loop, event) {
            self.exit_result = Err(e);
            event_loop.exit();
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Self::Error,
            LogLevel::Warn => Self::Warn,
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
            LogLevel::Trace => Self::Trace,
        }
    }
}

/// Known interpreter families whose quirks can be enabled together.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Preset {
    /// COSMAC VIP: shift Vy, Fx55/Fx65 advance I
    Vip,
    /// CHIP-48 and SUPER-CHIP: Bnnn adds Vx
    Chip48,
}

impl From<Preset> for Quirks {
    fn from(preset: Preset) -> Self {
        match preset {
            Preset::Vip => Quirks::cosmac_vip(),
            Preset::Chip48 => Quirks::chip48(),
        }
    }
}

/// CHIP-8 interpreter with configurable compatibility quirks.
///
/// Keys 1-4, Q-R, A-F, Z-V map to CHIP-8 keys.
/// Escape is used to exit the emulator.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the CHIP-8 ROM file
    rom_path: PathBuf,

    /// Instructions executed per second
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    updates_per_second: u32,

    /// 8xy6/8xyE shift Vy into Vx instead of shifting Vx in place
    #[arg(long = "shift")]
    shift: bool,

    /// Bnnn jumps to nnn + Vx instead of nnn + V0
    #[arg(long = "jumpWithOffset")]
    jump_with_offset: bool,

    /// Fx65 advances I past the loaded registers
    #[arg(long = "loadIncrementIndex")]
    load_increment_index: bool,

    /// Fx55 advances I past the stored registers
    #[arg(long = "storeIncrementIndex")]
    store_increment_index: bool,

    /// Fx1E clears VF when I does not overflow
    #[arg(long = "indexOverflowFlag")]
    index_overflow_flag: bool,

    /// Start from a family's quirks; individual quirk flags are added on top
    #[arg(long, value_enum)]
    preset: Option<Preset>,

    /// Window scale factor
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=64))]
    scale: u32,

    /// Verbosity of logging (RUST_LOG still applies on top)
    #[arg(short, long, value_enum, default_value_t = LogLevel::Warn)]
    debug: LogLevel,
}

impl Args {
    fn quirks(&self) -> Quirks {
        let base = self.preset.map(Quirks::from).unwrap_or_default();
        base.with_shift(base.shift || self.shift)
            .with_jump_with_offset(base.jump_with_offset || self.jump_with_offset)
            .with_load_increment_index(base.load_increment_index || self.load_increment_index)
            .with_store_increment_index(base.store_increment_index || self.store_increment_index)
            .with_index_overflow_flag(base.index_overflow_flag || self.index_overflow_flag)
    }
}

/// Drops flags clap does not know about so they can be ignored instead of
/// rejected. Returns the kept arguments and the dropped flags.
fn split_known_args(args: impl IntoIterator<Item = OsString>) -> (Vec<OsString>, Vec<String>) {
    let mut kept = Vec::new();
    let mut ignored = Vec::new();
    let mut expect_value = false;

    for (idx, arg) in args.into_iter().enumerate() {
        let text = arg.to_string_lossy().into_owned();

        if idx == 0 || expect_value || !text.starts_with('-') || text == "-" {
            expect_value = false;
            kept.push(arg);
            continue;
        }

        let name = text.split('=').next().unwrap_or_default();
        if SWITCHES.contains(&name) {
            kept.push(arg);
        } else if VALUE_FLAGS.contains(&name) {
            expect_value = !text.contains('=');
            kept.push(arg);
        } else {
            ignored.push(text);
        }
    }

    (kept, ignored)
}

fn init_logging(level: LogLevel) {
    env_logger::Builder::new()
        .filter_module("chip8_vm", level.into())
        .filter_module("emu", level.into())
        .parse_default_env()
        .init();
}

fn main() -> anyhow::Result<()> {
    let (args, ignored) = split_known_args(std::env::args_os());
    let args = Args::parse_from(args);

    init_logging(args.debug);
    for flag in &ignored {
        warn!("Ignoring unknown flag {flag}");
    }

    let rom = std::fs::read(&args.rom_path)
        .with_context(|| format!("Failed to read ROM file {}", args.rom_path.display()))?;

    let quirks = args.quirks();
    info!(
        "Running {} at {} updates per second with {quirks:?}",
        args.rom_path.display(),
        args.updates_per_second
    );

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(&rom, quirks, args.updates_per_second, args.scale)
        .context("Failed to initialize application")?;
    event_loop
        .run_app(&mut app)
        .context("Error occurred during event loop execution")?;

    // Return the result captured during the event loop
    app.exit_result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(args: &[&str]) -> (Vec<String>, Vec<String>) {
        let (kept, ignored) = split_known_args(args.iter().map(OsString::from));
        let kept = kept
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        (kept, ignored)
    }

    #[test]
    fn unknown_flags_are_dropped() {
        let (kept, ignored) = split(&["emu", "rom.ch8", "700", "--shift", "--turbo", "-x"]);
        assert_eq!(kept, ["emu", "rom.ch8", "700", "--shift"]);
        assert_eq!(ignored, ["--turbo", "-x"]);
    }

    #[test]
    fn value_flags_keep_their_values() {
        let (kept, ignored) = split(&["emu", "--debug", "trace", "rom.ch8", "--scale=4", "12"]);
        assert_eq!(kept, ["emu", "--debug", "trace", "rom.ch8", "--scale=4", "12"]);
        assert!(ignored.is_empty());
    }

    #[test]
    fn flags_map_to_quirks() {
        let args = Args::parse_from([
            "emu",
            "rom.ch8",
            "500",
            "--shift",
            "--storeIncrementIndex",
        ]);
        assert_eq!(
            args.quirks(),
            Quirks::default()
                .with_shift(true)
                .with_store_increment_index(true)
        );
        assert_eq!(args.scale, 10);
    }

    #[test]
    fn preset_combines_with_flags() {
        let args = Args::parse_from(["emu", "rom.ch8", "700", "--preset", "vip"]);
        assert_eq!(args.quirks(), Quirks::cosmac_vip());

        let args = Args::parse_from([
            "emu",
            "rom.ch8",
            "700",
            "--preset=chip48",
            "--indexOverflowFlag",
        ]);
        assert_eq!(
            args.quirks(),
            Quirks::chip48().with_index_overflow_flag(true)
        );

        assert!(Args::try_parse_from(["emu", "rom.ch8", "700", "--preset", "xo"]).is_err());
    }

    #[test]
    fn preset_value_survives_flag_filtering() {
        let (kept, ignored) = split(&["emu", "--preset", "vip", "rom.ch8", "700", "--fast"]);
        assert_eq!(kept, ["emu", "--preset", "vip", "rom.ch8", "700"]);
        assert_eq!(ignored, ["--fast"]);
    }

    #[test]
    fn missing_positionals_are_rejected() {
        assert!(Args::try_parse_from(["emu", "rom.ch8"]).is_err());
        assert!(Args::try_parse_from(["emu", "rom.ch8", "0"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
