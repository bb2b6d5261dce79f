//! air_canvas — interactive entry point.

use air_canvas::drawing_view::{self, DrawingViewOptions};
use air_canvas::error::CanvasError;
use air_canvas::particle_view::{self, ParticleViewOptions};
use std::io::{self, Write};

enum View {
    Particles,
    Drawing,
}

fn main() {
    tracing_subscriber::fmt::init();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║        Air Canvas — hand-gesture particles and drawing       ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let args: Vec<String> = std::env::args().collect();
    let use_camera = args.iter().any(|a| a == "--camera");
    let quick = args.iter().any(|a| a == "--quick");

    if use_camera {
        println!("  Input: webcam frames + pointer hand");
    } else {
        println!("  Input: pointer simulation  (use --camera for live video)");
    }
    println!();

    let view = if args.iter().any(|a| a == "--particles") || quick {
        View::Particles
    } else if args.iter().any(|a| a == "--draw") {
        View::Drawing
    } else {
        pick_view()
    };

    println!();
    println!("  Opening window…");
    println!();

    let result = match view {
        View::Particles => particle_view::run(ParticleViewOptions {
            use_camera,
            ..ParticleViewOptions::default()
        }),
        View::Drawing => drawing_view::run(DrawingViewOptions {
            use_camera,
            ..DrawingViewOptions::default()
        }),
    };

    if let Err(e) = result {
        report(&e);
        std::process::exit(1);
    }
}

fn pick_view() -> View {
    println!("  1. Particle field  — open palm scatters, closed fist gathers");
    println!("  2. Drawing board   — pinch to draw over the mirrored view");
    match read_line("  Choice (1–2, default 1): ").trim() {
        "2" => View::Drawing,
        _ => View::Particles,
    }
}

/// One specific line per failure category, then the raw cause for logs.
fn report(e: &CanvasError) {
    eprintln!();
    eprintln!("  {}", e.user_message());
    eprintln!("  ({e})");
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf
}
