use std::{io::Write, sync::Arc};

use framepace::{capture, config::Config, report};
use framepace_stats::{Metric, RelatedMetric};
use serde_json::json;

fn capture_json() -> String {
    let run = |frametime: f64, frames: u64, watts: f64| {
        let frames: Vec<_> = (0..frames)
            .map(|idx| {
                json!({
                    "ms_between_presents": frametime,
                    "time_in_seconds": idx as f64 * frametime / 1_000.0,
                    "counter": idx * 1_000,
                })
            })
            .collect();
        let power: Vec<_> = (0..frames.len() as u64 * 10)
            .map(|counter| json!({"counter": counter * 100, "value": watts}))
            .collect();
        json!({"frames": frames, "power": {"GPU Power": power}})
    };
    json!({"runs": [run(10.0, 500, 100.0), run(10.0, 500, 100.0), run(20.0, 500, 100.0)]})
        .to_string()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn capture_to_aggregate() {
    let mut capture_file = tempfile::NamedTempFile::new().expect("temp file");
    capture_file
        .write_all(capture_json().as_bytes())
        .expect("write capture");
    let mut config_file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        config_file,
        "second_metric: one_percent_low\nthird_metric: null\ngpu_power_channel: GPU Power"
    )
    .expect("write config");

    let session = capture::load(capture_file.path())
        .await
        .expect("valid capture");
    assert!(session.validate().is_valid());
    let config = Config::try_from_path(config_file.path()).expect("valid config");
    assert_eq!(config.second_metric, Some(Metric::OnePercentLow));
    assert_eq!(config.related_metric, RelatedMetric::Average);

    let reports = report::analyze_runs(Arc::new(session), Arc::new(config))
        .await
        .expect("analyzed");
    assert_eq!(reports.len(), 3);
    assert!(!reports[0].outlier);
    assert!(reports[2].outlier);
    assert_eq!(
        reports[0].analysis.summary,
        "Avg=100.00 FPS | 1% Low Avg=100.00 FPS"
    );
    // 100 FPS at 100 W
    assert_eq!(reports[0].gpu_fps_per_watt, Some(10.0));
    assert_eq!(reports[2].gpu_fps_per_watt, Some(5.0));

    let kept = report::aggregate(&reports, true);
    assert_eq!(kept.runs, 2);
    assert!((kept.average.mean - 100.0).abs() < 1e-9);
    assert!(kept.third.mean.is_nan());
}
