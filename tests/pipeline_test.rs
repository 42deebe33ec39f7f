use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{Rgb, RgbImage};
use iou_track::integration::{ImageDirSink, ImageDirSource, ReplayDetector, VecSink, VecSource};
use iou_track::{
    ChannelOrder, Detection, DetectionSource, Device, DeviceGuard, Frame, PipelineError, Size, StreamRunner,
    TrackState, TrackerPipeline,
};

const GREY: [u8; 3] = [128, 128, 128];

const DETECTIONS: &str = r#"[
    {"frame": 0, "x1": 50.0, "y1": 50.0, "x2": 150.0, "y2": 150.0, "score": 0.9, "label": "person"},
    {"frame": 6, "x1": 55.0, "y1": 50.0, "x2": 155.0, "y2": 150.0, "score": 0.8, "label": "person"}
]"#;

fn grey_frames(count: u64, size: Size) -> Vec<Frame> {
    (0..count)
        .map(|i| Frame::filled(i, size, ChannelOrder::Rgb, GREY).unwrap())
        .collect()
}

#[test]
fn test_replay_through_pipeline() {
    let detector = ReplayDetector::from_reader(Cursor::new(DETECTIONS)).unwrap();
    let mut pipeline = TrackerPipeline::with_default_config(detector);

    let mut outputs = Vec::new();
    for frame in grey_frames(8, Size::new(600, 600)) {
        outputs.push(pipeline.process(&frame).unwrap());
    }

    // Single hit stays hidden until the second detector call confirms it
    for tracks in &outputs[..6] {
        assert!(tracks.is_empty());
    }

    assert_eq!(outputs[6].len(), 1);
    let view = &outputs[6][0];
    assert_eq!(view.id, 1);
    assert_eq!(view.state, TrackState::Confirmed);
    assert_eq!(view.class_label.as_deref(), Some("person"));
    let [x1, y1, x2, y2] = view.bbox.to_tlbr();
    assert!((x1 - 110.0).abs() < 1e-3);
    assert!((y1 - 100.0).abs() < 1e-3);
    assert!((x2 - 310.0).abs() < 1e-3);
    assert!((y2 - 300.0).abs() < 1e-3);

    // Carried forward on the skipped cycle
    assert_eq!(outputs[7].len(), 1);
    assert_eq!(outputs[7][0].state, TrackState::Lost);
    assert_eq!(outputs[7][0].bbox, view.bbox);
    assert_eq!(pipeline.get_boxes(), vec![view.bbox]);
    assert_eq!(pipeline.cycle(), 8);
}

#[test]
fn test_image_directory_round_trip() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    for i in 0..8 {
        RgbImage::from_pixel(120, 120, Rgb(GREY))
            .save(input.path().join(format!("in_{i:03}.png")))
            .unwrap();
    }
    // Ignored: not an image
    std::fs::write(input.path().join("notes.txt"), "skip me").unwrap();

    let detector = ReplayDetector::from_reader(Cursor::new(DETECTIONS)).unwrap();
    let mut runner = StreamRunner::new(TrackerPipeline::with_default_config(detector));
    let mut source = ImageDirSource::open(input.path()).unwrap();
    assert_eq!(source.remaining(), 8);
    let mut sink = ImageDirSink::create(output.path()).unwrap();

    let summary = runner.run(&mut source, &mut sink).unwrap();
    assert_eq!(summary.frames, 8);
    assert_eq!(summary.detector_calls, 2);
    assert_eq!(summary.write_failures, 0);
    assert!(!summary.read_failed);

    let annotated: Vec<usize> = (0..8)
        .map(|i| {
            let written = image::open(sink.frame_path(i)).unwrap().to_rgb8();
            assert_eq!(written.dimensions(), (120, 120));
            written.pixels().filter(|px| px.0 != GREY).count()
        })
        .collect();
    assert!(annotated[..6].iter().all(|&n| n == 0));
    assert!(annotated[6] > 0);
    assert!(annotated[7] > 0);
}

struct Accelerator {
    opens: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    fail_on_cycle: Option<usize>,
    calls: usize,
}

#[derive(Debug, thiserror::Error)]
#[error("accelerator fault")]
struct Fault;

impl Device for Accelerator {
    type Error = Fault;

    fn open(&mut self) -> Result<(), Fault> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) -> Result<(), Fault> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "accelerator"
    }
}

impl DetectionSource for Accelerator {
    type Error = Fault;

    fn detect(&mut self, _image: &Frame) -> Result<Vec<Detection>, Fault> {
        self.calls += 1;
        if self.fail_on_cycle == Some(self.calls) {
            return Err(Fault);
        }
        Ok(vec![Detection::new(10.0, 10.0, 60.0, 60.0, 0.9)])
    }
}

fn accelerator(fail_on_cycle: Option<usize>) -> (Accelerator, Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let opens = Arc::new(AtomicUsize::new(0));
    let closes = Arc::new(AtomicUsize::new(0));
    let device = Accelerator {
        opens: Arc::clone(&opens),
        closes: Arc::clone(&closes),
        fail_on_cycle,
        calls: 0,
    };
    (device, opens, closes)
}

#[test]
fn test_guarded_device_closed_after_run() {
    let (device, opens, closes) = accelerator(None);
    let guard = DeviceGuard::acquire(device).unwrap();
    let mut runner = StreamRunner::new(TrackerPipeline::with_default_config(guard));

    let mut source = VecSource::new(grey_frames(3, Size::new(300, 300)));
    let mut sink = VecSink::default();
    let summary = runner.run(&mut source, &mut sink).unwrap();
    assert_eq!(summary.frames, 3);
    assert_eq!(sink.frames.len(), 3);
    assert_eq!(closes.load(Ordering::SeqCst), 0);

    let (guard, _tracker) = runner.into_pipeline().into_parts();
    assert_eq!(guard.calls, 1);
    guard.release().unwrap();
    assert_eq!(opens.load(Ordering::SeqCst), 1);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_device_fault_aborts_run_and_closes_device() {
    let (device, _opens, closes) = accelerator(Some(1));
    {
        let guard = DeviceGuard::acquire(device).unwrap();
        let mut runner = StreamRunner::new(TrackerPipeline::with_default_config(guard));
        let mut source = VecSource::new(grey_frames(3, Size::new(300, 300)));
        let mut sink = VecSink::default();

        let err = runner.run(&mut source, &mut sink).unwrap_err();
        assert!(matches!(err, PipelineError::Device(_)));
        assert!(sink.frames.is_empty());
    }
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}
