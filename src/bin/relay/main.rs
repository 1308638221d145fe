//! The relay's command surface: an interactive prompt over the registry,
//! or a one-shot replay of a saved session file.

use clap::Parser;
use log::{info, warn};
use mocaprelay::{
    args::{RelayArgs, RelayTask},
    event::RelayEvent,
    player::{PlaybackSpeed, Player},
    recorder::Recorder,
    registry::ConnectionRegistry,
    session::Recording,
};

use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::sync::Arc;

fn main() {
    env_logger::init();
    let args = RelayArgs::parse();

    let registry = ConnectionRegistry::new();

    // Print every lifecycle event the way the UI would toast it.
    let _events = registry.subscribe(|event| {
        println!("[{:?}] {}", event.kind(), event.message());
    });

    match args.command {
        RelayTask::Replay(cmd) => {
            let recording = match Recording::from_path(&cmd.infile) {
                Ok(recording) => Arc::new(recording),
                Err(err) => {
                    eprintln!("could not load {}: {}", cmd.infile, err);
                    std::process::exit(1);
                }
            };
            info!("replaying {} frames from {}", recording.len(), cmd.infile);

            // A channel bridged from the notifier tells us when a
            // non-looping replay ran out of frames.
            let (finished_tx, finished_rx) = mpsc::channel();
            let _finish = registry.subscribe(move |event| {
                if matches!(event, RelayEvent::PlaybackFinished) {
                    let _ = finished_tx.send(());
                }
            });

            let mut player = Player::new(registry);
            player.play(recording, PlaybackSpeed::nearest(cmd.speed), cmd.looping);

            if cmd.looping {
                // Looping replays run until the process is killed.
                loop {
                    std::thread::park();
                }
            }
            let _ = finished_rx.recv();
        }
        RelayTask::Interactive(cmd) => {
            let mut recorder = Recorder::new(registry.clone());
            let mut player = Player::new(registry.clone());
            let mut loaded: Option<Arc<Recording>> = None;

            if let Some(path) = &cmd.load {
                match Recording::from_path(path) {
                    Ok(recording) => {
                        println!("loaded {} frames from {}", recording.len(), path);
                        loaded = Some(Arc::new(recording));
                    }
                    Err(err) => warn!("could not load {}: {}", path, err),
                }
            }

            println!("mocap relay ready, 'help' lists commands");
            let stdin = io::stdin();
            loop {
                print!("> ");
                let _ = io::stdout().flush();
                let mut line = String::new();
                match stdin.lock().read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
                if !dispatch(&line, &registry, &mut recorder, &mut player, &mut loaded) {
                    break;
                }
            }
        }
    }
}

/// Runs one prompt line. Returns false when the session should end.
fn dispatch(
    line: &str,
    registry: &ConnectionRegistry,
    recorder: &mut Recorder,
    player: &mut Player,
    loaded: &mut Option<Arc<Recording>>,
) -> bool {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        [] => {}
        ["quit"] | ["exit"] => return false,
        ["help"] => print_help(),

        ["connect", target, endpoint] => {
            if let Err(err) = registry.connect(target, endpoint) {
                println!("connect rejected: {}", err);
            }
        }
        ["disconnect", target] => registry.disconnect(target),
        ["offset", target, x, y, z] => {
            match (x.parse::<f32>(), y.parse::<f32>(), z.parse::<f32>()) {
                (Ok(x), Ok(y), Ok(z)) => registry.set_offset(target, x, y, z),
                _ => println!("offset takes three numbers"),
            }
        }
        ["status"] => {
            for view in registry.snapshot() {
                let endpoint = view.endpoint.as_deref().unwrap_or("(playback)");
                println!(
                    "{:<12} {:<12} {:<24} {:?}",
                    view.target,
                    view.status.to_string(),
                    endpoint,
                    view.sample.components()
                );
            }
        }

        ["record"] => recorder.start(),
        ["save", path] => {
            let recording = recorder.stop();
            println!("captured {} frames", recording.len());
            match recording.to_path(path) {
                Ok(()) => println!("saved to {}", path),
                Err(err) => println!("save failed: {}", err),
            }
            *loaded = Some(Arc::new(recording));
        }

        ["load", path] => match Recording::from_path(path) {
            Ok(recording) => {
                println!("loaded {} frames", recording.len());
                *loaded = Some(Arc::new(recording));
            }
            Err(err) => println!("load failed: {}", err),
        },
        ["play"] => match loaded {
            Some(recording) => player.play(Arc::clone(recording), PlaybackSpeed::Normal, false),
            None => println!("nothing loaded"),
        },
        ["play", speed] => match (loaded.as_ref(), speed.parse::<f64>()) {
            (Some(recording), Ok(speed)) => {
                player.play(Arc::clone(recording), PlaybackSpeed::nearest(speed), false)
            }
            (None, _) => println!("nothing loaded"),
            (_, Err(_)) => println!("play takes a numeric speed"),
        },
        ["speed", rate] => match rate.parse::<f64>() {
            Ok(rate) => player.set_speed(PlaybackSpeed::nearest(rate)),
            Err(_) => println!("speed takes a numeric rate"),
        },
        ["loop", flag] => player.set_looping(*flag == "on"),
        ["pause"] => player.pause(),
        ["resume"] => player.resume(),
        ["stop"] => player.stop(),

        _ => println!("unrecognized command, 'help' lists commands"),
    }
    true
}

fn print_help() {
    println!(
        "\
commands:
  connect <target> <host:port>   bind a sensor to a target
  disconnect <target>            remove a target's connection
  offset <target> <x> <y> <z>    set calibration offset, radians
  status                         list current connections
  record                         arm the recorder
  save <file>                    disarm the recorder and save the capture
  load <file>                    load a saved session
  play [speed]                   replay the loaded session
  speed <rate>                   change the playback rate in place
  loop on|off                    toggle wrap-around during playback
  pause / resume / stop          playback transport controls
  quit"
    );
}
