//! Integration tests for zero-shot forecasting with a pretrained decoder.

use burn_ndarray::NdArray;
use chrono::NaiveDate;
use ndarray::Array2;

use tsforge::prelude::*;
use tsforge_core::CoreError;

type InferenceBackend = NdArray;

fn day(d: u32) -> TimePoint {
    TimePoint::from(NaiveDate::from_ymd_opt(2024, 1, d).unwrap())
}

/// Three meters observed daily from 2024-01-01; meter `i` reads `i * 100 + t`.
fn meter_panel(length: u32) -> PanelFrame {
    let meters = ["m0", "m1", "m2"];
    let mut instances = Vec::new();
    let mut times = Vec::new();
    let mut values = Vec::new();
    for (i, meter) in meters.iter().enumerate() {
        for t in 0..length {
            instances.push(InstanceKey::from(*meter));
            times.push(day(t + 1));
            values.push((i * 100) as f32 + t as f32);
        }
    }
    let values = Array2::from_shape_vec((values.len(), 1), values).unwrap();
    PanelFrame::from_panel(
        vec!["meter".to_string()],
        "day",
        instances,
        times,
        vec!["load".to_string()],
        values,
    )
    .unwrap()
    .with_freq("D".parse().unwrap())
}

fn forecaster(config: ZeroShotConfig) -> ZeroShotForecaster<InferenceBackend, NaiveDecoder> {
    ZeroShotForecaster::new(NaiveDecoder::default(), config, Default::default()).unwrap()
}

#[test]
fn test_last_value_forecast_per_instance() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let mut zs = forecaster(ZeroShotConfig::new(4, 3));
    zs.fit(&meter_panel(10), None).unwrap();
    assert_eq!(zs.horizon_len(), Some(3));

    let forecast = zs.predict(None, None).unwrap();
    assert_eq!(forecast.n_rows(), 9);
    assert_eq!(forecast.index().names(), vec!["meter", "day"]);
    assert_eq!(
        forecast.index().times()[..3],
        [day(11), day(12), day(13)]
    );
    assert_eq!(
        forecast.values().column(0).to_vec(),
        vec![9.0, 9.0, 9.0, 109.0, 109.0, 109.0, 209.0, 209.0, 209.0]
    );
}

#[test]
fn test_short_history_is_padded() {
    // Context longer than the series: the last observed value still drives
    // the forecast.
    let mut zs = forecaster(ZeroShotConfig::new(32, 2));
    zs.fit(&meter_panel(5), None).unwrap();
    let forecast = zs.predict(None, None).unwrap();
    assert_eq!(
        forecast.values().column(0).to_vec(),
        vec![4.0, 4.0, 104.0, 104.0, 204.0, 204.0]
    );
}

#[test]
fn test_chunked_decoding_matches_single_batch() {
    let panel = meter_panel(12);

    let mut batched = forecaster(ZeroShotConfig::new(6, 2));
    batched.fit(&panel, None).unwrap();
    let mut chunked = forecaster(ZeroShotConfig::new(6, 2).with_per_core_batch_size(1));
    chunked.fit(&panel, None).unwrap();

    assert_eq!(
        batched.predict(None, None).unwrap(),
        chunked.predict(None, None).unwrap()
    );
}

#[test]
fn test_horizon_len_and_filtering() {
    let mut zs = forecaster(ZeroShotConfig::new(8, 2).with_freq(0));
    let fh = ForecastingHorizon::relative([1, 5]).unwrap();
    zs.fit(&meter_panel(10), Some(&fh)).unwrap();
    assert_eq!(zs.horizon_len(), Some(5));

    let forecast = zs.predict(Some(&fh), None).unwrap();
    assert_eq!(forecast.n_rows(), 6);
    assert_eq!(forecast.index().times()[..2], [day(11), day(15)]);

    let too_far = ForecastingHorizon::range(6).unwrap();
    assert!(matches!(
        zs.predict(Some(&too_far), None),
        Err(TrainError::HorizonExceedsMaximum { requested: 6, max: 5 })
    ));
}

#[test]
fn test_predict_on_new_panel() {
    let mut zs = forecaster(ZeroShotConfig::new(4, 2));
    zs.fit(&meter_panel(10), None).unwrap();

    let forecast = zs.predict(None, Some(&meter_panel(20))).unwrap();
    assert_eq!(forecast.index().times()[0], day(21));
    assert_eq!(forecast.values()[[0, 0]], 19.0);
}

#[test]
fn test_rejects_multivariate_and_unfitted() {
    let zs = forecaster(ZeroShotConfig::default());
    assert!(matches!(
        zs.predict(None, None),
        Err(TrainError::NotFitted(_))
    ));

    let wide = PanelFrame::from_series(
        (0..6).map(TimePoint::Int).collect(),
        vec!["a".to_string(), "b".to_string()],
        Array2::zeros((6, 2)),
    )
    .unwrap();
    let mut zs = forecaster(ZeroShotConfig::default());
    assert!(zs.fit(&wide, None).is_err());
    assert!(!zs.is_fitted());
}

#[test]
fn test_unavailable_backend() {
    if ComputeBackend::Wgpu.is_available() {
        return;
    }
    let config = ZeroShotConfig::default().with_backend("gpu".parse().unwrap());
    let result = ZeroShotForecaster::<InferenceBackend, NaiveDecoder>::new(
        NaiveDecoder::default(),
        config,
        Default::default(),
    );
    assert!(matches!(
        result,
        Err(TrainError::Core(CoreError::MissingDependency { .. }))
    ));
}
