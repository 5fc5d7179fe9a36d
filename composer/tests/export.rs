use std::{
    fs,
    path::Path,
    sync::{Arc, atomic::AtomicBool},
    thread,
    time::Duration,
};

use composer::{
    BoxFormat, ComposeConfig, ComposeError, ExportEvent, ExportOptions, ExportWorker, SourceObject,
    SourceSet, export,
};
use image::{GrayImage, Luma};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn digits() -> SourceSet {
    let objs = (0..10)
        .map(|c| {
            let img = GrayImage::from_fn(28, 28, |x, y| {
                if (8..20).contains(&x) && (5..23).contains(&y) {
                    Luma([255])
                } else {
                    Luma([0])
                }
            });
            SourceObject::new(img, c)
        })
        .collect();
    SourceSet::prepare(objs, |_| {}).unwrap()
}

fn config() -> ComposeConfig {
    ComposeConfig {
        width: 64,
        height: 64,
        max_objects: 6,
        grid_rows: 4,
        grid_cols: 4,
        max_scale: 2.0,
        ..ComposeConfig::default()
    }
}

fn sorted_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn parse_label(line: &str) -> (u32, [f64; 4]) {
    let parts: Vec<&str> = line.split(' ').collect();
    assert_eq!(parts.len(), 5, "{line}");
    let class = parts[0].parse().unwrap();
    let mut v = [0.0; 4];
    for (slot, raw) in v.iter_mut().zip(&parts[1..]) {
        let (_, decimals) = raw.split_once('.').unwrap();
        assert_eq!(decimals.len(), 6, "{raw}");
        *slot = raw.parse().unwrap();
    }
    (class, v)
}

#[test]
fn exports_matching_image_and_label_files() {
    init();
    let tmp = tempfile::tempdir().unwrap();
    let mut options = ExportOptions::new(tmp.path(), 5);
    options.seed = Some(3);
    let mut updates = Vec::new();
    let summary = export(
        &digits(),
        &config(),
        &options,
        |p| updates.push(p.percent),
        &AtomicBool::new(false),
    )
    .unwrap();

    assert_eq!(summary.samples, 5);
    let images = sorted_names(&tmp.path().join("images"));
    let labels = sorted_names(&tmp.path().join("labels"));
    let ids: Vec<String> = (0..5).map(|i| format!("{i:08}")).collect();
    assert_eq!(images, ids.iter().map(|i| format!("{i}.png")).collect::<Vec<_>>());
    assert_eq!(labels, ids.iter().map(|i| format!("{i}.txt")).collect::<Vec<_>>());
    assert_eq!(updates.last().copied(), Some(100.0));

    let mut objects = 0;
    for name in &labels {
        let text = fs::read_to_string(tmp.path().join("labels").join(name)).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines.len() <= 6);
        for line in lines {
            let (class, [cx, cy, w, h]) = parse_label(line);
            assert!(class < 10);
            for v in [cx, cy, w, h] {
                assert!((0.0..=1.0).contains(&v), "{line}");
            }
            assert!(cx - w / 2.0 >= -1e-6 && cx + w / 2.0 <= 1.0 + 1e-6);
            objects += 1;
        }
    }
    assert_eq!(objects, summary.objects);

    let img = image::open(tmp.path().join("images").join(&images[0])).unwrap();
    assert_eq!((img.width(), img.height()), (64, 64));
}

#[test]
fn same_seed_same_dataset() {
    init();
    let sources = digits();
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    for dir in [&a, &b] {
        let mut options = ExportOptions::new(dir.path(), 4);
        options.seed = Some(99);
        export(&sources, &config(), &options, |_| {}, &AtomicBool::new(false)).unwrap();
    }
    for i in 0..4 {
        let name = format!("labels/{i:08}.txt");
        assert_eq!(
            fs::read_to_string(a.path().join(&name)).unwrap(),
            fs::read_to_string(b.path().join(&name)).unwrap()
        );
        let name = format!("images/{i:08}.png");
        assert_eq!(
            fs::read(a.path().join(&name)).unwrap(),
            fs::read(b.path().join(&name)).unwrap()
        );
    }
}

#[test]
fn corner_labels_when_requested() {
    init();
    let tmp = tempfile::tempdir().unwrap();
    let mut options = ExportOptions::new(tmp.path(), 20);
    options.seed = Some(5);
    options.label_format = BoxFormat::Corner;
    export(&digits(), &config(), &options, |_| {}, &AtomicBool::new(false)).unwrap();
    for i in 0..20 {
        let text = fs::read_to_string(tmp.path().join(format!("labels/{i:08}.txt"))).unwrap();
        for line in text.lines() {
            let (_, [x0, y0, x1, y1]) = parse_label(line);
            assert!(x0 <= x1 && y0 <= y1);
        }
    }
}

#[test]
fn cancelled_export_stops_before_next_sample() {
    init();
    let tmp = tempfile::tempdir().unwrap();
    let options = ExportOptions::new(tmp.path(), 10);
    let res = export(&digits(), &config(), &options, |_| {}, &AtomicBool::new(true));
    assert!(matches!(res, Err(ComposeError::Cancelled(0))));
    assert!(sorted_names(&tmp.path().join("images")).is_empty());
}

#[test]
fn unwritable_root_aborts() {
    init();
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("taken");
    fs::write(&file, b"x").unwrap();
    let options = ExportOptions::new(&file, 3);
    let res = export(&digits(), &config(), &options, |_| {}, &AtomicBool::new(false));
    assert!(matches!(res, Err(ComposeError::Io(_))));
}

#[test]
fn failed_label_write_leaves_no_partial_sample() {
    init();
    let tmp = tempfile::tempdir().unwrap();
    // a directory squatting on the first label path makes its rename fail
    fs::create_dir_all(tmp.path().join("labels/00000000.txt")).unwrap();
    let mut options = ExportOptions::new(tmp.path(), 3);
    options.seed = Some(2);
    let res = export(&digits(), &config(), &options, |_| {}, &AtomicBool::new(false));
    assert!(matches!(res, Err(ComposeError::Io(_))), "{res:?}");

    assert!(sorted_names(&tmp.path().join("images")).is_empty());
    assert_eq!(sorted_names(&tmp.path().join("labels")), vec!["00000000.txt"]);
    assert!(tmp.path().join("labels/00000000.txt").is_dir());
}

#[test]
fn worker_can_be_polled() {
    init();
    let tmp = tempfile::tempdir().unwrap();
    let mut options = ExportOptions::new(tmp.path(), 10);
    options.seed = Some(6);
    let worker = ExportWorker::spawn(Arc::new(digits()), config(), options);
    let mut progress = 0;
    let summary = loop {
        match worker.try_next() {
            Some(ExportEvent::Progress(_)) => progress += 1,
            Some(ExportEvent::Finished(res)) => break res.unwrap(),
            None => thread::sleep(Duration::from_millis(5)),
        }
    };
    assert_eq!(summary.samples, 10);
    assert_eq!(progress, 10);
    assert!(worker.try_next().is_none());
}

#[test]
fn worker_streams_progress_and_result() {
    init();
    let tmp = tempfile::tempdir().unwrap();
    let mut options = ExportOptions::new(tmp.path(), 250);
    options.seed = Some(1);
    let worker = ExportWorker::spawn(Arc::new(digits()), config(), options);
    let mut updates = Vec::new();
    let summary = worker.wait(|p| updates.push(p)).unwrap();
    assert_eq!(summary.samples, 250);
    // every 2 samples for 250
    assert_eq!(updates.len(), 125);
    assert!(updates.windows(2).all(|w| w[0].percent < w[1].percent));
    assert_eq!(sorted_names(&tmp.path().join("labels")).len(), 250);
}

#[test]
fn worker_can_be_cancelled() {
    init();
    let tmp = tempfile::tempdir().unwrap();
    let options = ExportOptions::new(tmp.path(), 100_000);
    let worker = ExportWorker::spawn(Arc::new(digits()), config(), options);
    worker.cancel();
    let res = worker.wait(|_| {});
    let Err(ComposeError::Cancelled(done)) = res else {
        panic!("expected cancellation, got {res:?}");
    };
    assert!(done < 100_000);
    assert_eq!(sorted_names(&tmp.path().join("images")).len(), done);
}
