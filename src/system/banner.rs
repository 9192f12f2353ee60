use std::io::IsTerminal;

use crossterm::style::{Color, Stylize};

const BANNER_LINES: [&str; 6] = [
    "███████╗██╗   ██╗██████╗  ██████╗ ███████╗",
    "██╔════╝██║   ██║██╔══██╗██╔════╝ ██╔════╝",
    "███████╗██║   ██║██████╔╝██║  ███╗█████╗  ",
    "╚════██║██║   ██║██╔══██╗██║   ██║██╔══╝  ",
    "███████║╚██████╔╝██║  ██║╚██████╔╝███████╗",
    "╚══════╝ ╚═════╝ ╚═╝  ╚═╝ ╚═════╝ ╚══════╝",
];

const COLOR_TOP: (u8, u8, u8) = (0x00, 0xc2, 0xd1);
const COLOR_BOTTOM: (u8, u8, u8) = (0x1e, 0x4f, 0xd8);

/// Prints the startup banner with a vertical colour fade.
pub fn print_banner(no_color: bool) {
    let use_color = !no_color && std::io::stdout().is_terminal();
    let last = BANNER_LINES.len().saturating_sub(1);
    for (idx, line) in BANNER_LINES.iter().enumerate() {
        if use_color {
            let (r, g, b) = fade(COLOR_TOP, COLOR_BOTTOM, idx, last);
            println!("{}", line.with(Color::Rgb { r, g, b }));
        } else {
            println!("{line}");
        }
    }

    let description = format!(
        "surge v{} | concurrent HTTP and WebSocket load testing",
        env!("CARGO_PKG_VERSION")
    );
    if use_color {
        println!("{}", description.with(Color::Grey));
    } else {
        println!("{description}");
    }
}

/// Linear interpolation between two colours at step `idx` of `last`.
fn fade(from: (u8, u8, u8), to: (u8, u8, u8), idx: usize, last: usize) -> (u8, u8, u8) {
    let ratio = if last == 0 {
        0.0
    } else {
        idx.min(last) as f64 / last as f64
    };
    let channel = |start: u8, end: u8| -> u8 {
        let value = f64::from(start) + (f64::from(end) - f64::from(start)) * ratio;
        value.round().clamp(0.0, 255.0) as u8
    };
    (
        channel(from.0, to.0),
        channel(from.1, to.1),
        channel(from.2, to.2),
    )
}
