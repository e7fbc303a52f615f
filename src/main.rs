use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use keyglow::activity::{KeyActivityBus, DEFAULT_HISTORY_WINDOW};
use keyglow::cli::Cli;
use keyglow::config;
use keyglow::controller::Controller;
use keyglow::engine::EffectEngine;
use keyglow::error::{Error, Result};
use keyglow::preset::PresetRegistry;
use keyglow::watch::{FocusWatcher, KeyActivityWatcher, ShortcutWatcher};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("keyglow=info".parse().expect("static directive")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Fatal error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let registry = PresetRegistry::builtin();
    let mut runtime = config::load(&cli.config, &registry)?;

    if !runtime.transport.connect(&runtime.model) {
        return Err(Error::TransportConnect);
    }

    let model = Arc::clone(&runtime.model);
    let bus = Arc::new(KeyActivityBus::new(
        model.key_count(),
        DEFAULT_HISTORY_WINDOW,
    ));

    let mut engine = EffectEngine::new(Arc::clone(&model), runtime.transport);
    engine.set_activity_bus(Arc::clone(&bus));
    engine.set_presets(runtime.presets, Some(std::mem::take(&mut runtime.preset_masks)));
    engine.set_draw_list(&runtime.initial_draw_list);

    let controller = Controller::new(
        engine,
        runtime.preset_parameters,
        runtime.frame_interval,
    );

    // Watchers only spin up when the config gives them something to do
    let mut key_watcher = if model.has_keycode_map() {
        let mut watcher = KeyActivityWatcher::new(Arc::clone(&model), Arc::clone(&bus));
        watcher.start();
        Some(watcher)
    } else {
        None
    };

    let mut shortcut_watcher = None;
    let mut focus_watcher = None;
    if let Some(focus) = runtime.focus {
        if let Some(overlay_index) = focus.overlay_preset {
            if !focus.shortcuts.shortcuts.is_empty() {
                let mut watcher = ShortcutWatcher::new(
                    controller.clone(),
                    Arc::clone(&focus.profiles),
                    Arc::clone(&focus.shortcuts),
                    model.key_count(),
                    overlay_index,
                );
                watcher.start();
                shortcut_watcher = Some(watcher);
            }
        }

        let mut watcher = FocusWatcher::new(
            controller.clone(),
            Arc::clone(&focus.profiles),
            focus.events_socket.clone(),
        );
        if let Some(shortcut) = &shortcut_watcher {
            let state = shortcut.state();
            watcher.set_class_callback(move |class| state.set_active_class(class));
        }
        watcher.start();
        focus_watcher = Some(watcher);
    }

    if cli.headless {
        run_headless(&controller);
    } else {
        controller.run_prompt();
    }

    if let Some(watcher) = &mut focus_watcher {
        watcher.stop();
    }
    if let Some(watcher) = &mut shortcut_watcher {
        watcher.stop();
    }
    if let Some(watcher) = &mut key_watcher {
        watcher.stop();
    }
    controller.stop_render_loop();
    Ok(())
}

fn run_headless(controller: &Controller) {
    controller.sync_render_state(true);
    info!("running headless; Ctrl-C to stop");

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        handler_flag.store(false, Ordering::SeqCst);
    })
    .ok();

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(200));
    }
    info!("shutting down");
}
