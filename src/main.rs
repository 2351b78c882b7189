mod args;

use std::sync::Arc;
use std::time::Duration;

use args::{Args, Mode};
use minimap_sense::capture::{FrameSource, ReplaySource, ScreenCapture};
use minimap_sense::perception::{
    PerceptionCommand, PerceptionEngine, PerceptionLoop, TemplateSet, create_perception_channels,
};

fn main() {
    let Some(args) = Args::parse() else {
        return;
    };

    let default_filter = if args.debug_mode { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("❌ Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };
    let code = rt.block_on(run(args));
    std::process::exit(code);
}

async fn run(args: Args) -> i32 {
    let config = args.config();

    let templates = match TemplateSet::load_from_dir(&args.assets_dir, config.color_model) {
        Ok(templates) => Arc::new(templates),
        Err(e) => {
            log::error!("❌ {}", e);
            return 1;
        }
    };

    // Replay runs stop once every recorded frame has been perceived
    let (source, frame_limit): (Box<dyn FrameSource>, Option<u64>) = match &args.mode {
        Mode::Live => {
            log::info!("📸 Capturing the screen (region: {:?})", config.capture_region);
            (Box::new(ScreenCapture::new(config.capture_retry)), None)
        }
        Mode::Replay(files) => match ReplaySource::from_files(files, false) {
            Ok(source) => {
                log::info!("🎞️ Replaying {} recorded frames", files.len());
                (Box::new(source), Some(files.len() as u64))
            }
            Err(e) => {
                log::error!("❌ {}", e);
                return 1;
            }
        },
    };

    let (cmd_tx, cmd_rx, state_writer, mut state_reader) = create_perception_channels();
    let engine = PerceptionEngine::new(source, templates, config, state_writer);
    let perception = tokio::spawn(PerceptionLoop::new(engine, cmd_rx).run());

    let reporter_tx = cmd_tx.clone();
    let reporter = tokio::spawn(async move {
        while state_reader.changed().await {
            let state = state_reader.snapshot();
            match serde_json::to_string(&state) {
                Ok(line) => println!("{}", line),
                Err(e) => log::warn!("⚠️ Could not serialize state: {}", e),
            }
            if frame_limit.is_some_and(|limit| state.tick >= limit) {
                log::info!("🎞️ Replay finished after {} cycles", state.tick);
                let _ = reporter_tx.send(PerceptionCommand::Shutdown).await;
                break;
            }
        }
    });

    if let Some(secs) = args.timeout_secs {
        let timeout_tx = cmd_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            log::info!("⏰ Timeout of {}s reached, shutting down", secs);
            let _ = timeout_tx.send(PerceptionCommand::Shutdown).await;
        });
    }

    let result = perception.await;
    drop(cmd_tx);
    let _ = reporter.await;

    match result {
        Ok(Ok(())) => 0,
        Ok(Err(e)) => {
            log::error!("❌ Perception failed: {}", e);
            1
        }
        Err(e) => {
            log::error!("❌ Perception task did not complete: {}", e);
            1
        }
    }
}
