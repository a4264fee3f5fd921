use document::{LayerHost, LayerId, Manifest, MemoryDocument, Raster, Rect};
use export::{
    collect, export, CancelToken, ColorReduction, ExportConfigBuilder, ExportError, Format,
    FormatParameters, Png8Options, Progress, ProgressCallback, NAME_SUFFIX_LIMIT,
};
use rgb::RGBA8;
use std::fs;
use std::path::Path;

const SIZE: u32 = 8;

fn solid(x: i32, color: RGBA8) -> Raster {
    Raster::solid(Rect::new(x, 0, 1, SIZE), color)
}

fn names(layers: &[document::LayerHandle]) -> Vec<String> {
    layers.iter().map(|l| l.name.clone()).collect()
}

fn config(format: Format, dir: &Path) -> export::ExportConfig {
    ExportConfigBuilder::new(format, dir).finalize().unwrap()
}

/// bottom to top: base, group { inner-a, hidden-inner, sub (hidden) { deep } }, top
fn nested() -> (MemoryDocument, Vec<LayerId>) {
    let mut doc = MemoryDocument::new(SIZE, SIZE);
    let base = doc.add_layer(None, "base", solid(0, RGBA8::new(255, 0, 0, 255))).unwrap();
    let group = doc.add_group(None, "group").unwrap();
    let inner_a = doc.add_layer(Some(group), "inner-a", solid(1, RGBA8::new(0, 255, 0, 255))).unwrap();
    let hidden_inner = doc
        .add_layer(Some(group), "hidden-inner", solid(2, RGBA8::new(0, 0, 255, 255)))
        .unwrap();
    let sub = doc.add_group(Some(group), "sub").unwrap();
    let deep = doc.add_layer(Some(sub), "deep", solid(3, RGBA8::new(9, 9, 9, 255))).unwrap();
    let top = doc.add_layer(None, "top", solid(4, RGBA8::new(200, 200, 0, 255))).unwrap();
    doc.set_visible(hidden_inner, false).unwrap();
    doc.set_visible(sub, false).unwrap();
    (doc, vec![base, group, inner_a, hidden_inner, sub, deep, top])
}

#[test]
fn flat_documents_collect_in_stable_order() {
    for n in 1..=6 {
        let mut doc = MemoryDocument::new(SIZE, SIZE);
        let ids: Vec<_> = (0..n)
            .map(|i| doc.add_layer(None, format!("layer {i}"), solid(0, RGBA8::new(1, 1, 1, 255))).unwrap())
            .collect();
        for (i, id) in ids.iter().enumerate() {
            if i % 2 == 1 {
                doc.set_visible(*id, false).unwrap();
            }
        }

        let first = collect(&mut doc, &CancelToken::new(), None).unwrap();
        let second = collect(&mut doc, &CancelToken::new(), None).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.all().len(), n);

        let expected: Vec<String> = (0..n).rev().filter(|i| i % 2 == 0).map(|i| format!("layer {i}")).collect();
        assert_eq!(names(first.visible()), expected);
    }
}

#[test]
fn visibility_is_and_of_ancestors() {
    let (mut doc, _) = nested();
    let layers = collect(&mut doc, &CancelToken::new(), None).unwrap();
    assert_eq!(names(layers.all()), ["top", "deep", "hidden-inner", "inner-a", "base"]);
    assert_eq!(names(layers.visible()), ["top", "inner-a", "base"]);

    // visible is an ordered subset of all
    let mut all = layers.all().iter();
    for layer in layers.visible() {
        assert!(all.any(|l| l == layer));
    }
}

#[test]
fn export_restores_every_flag() {
    let dir = tempfile::tempdir().unwrap();
    let (mut doc, ids) = nested();
    doc.activate(ids[2]).unwrap();
    let before = doc.visibility();

    let layers = collect(&mut doc, &CancelToken::new(), None).unwrap();
    let outcome = export(&mut doc, &layers, &config(Format::Png24, dir.path()), &CancelToken::new(), None).unwrap();

    assert_eq!(outcome.succeeded, 5);
    assert_eq!(doc.visibility(), before);
    assert_eq!(doc.active(), Some(ids[2]));
    assert_eq!(doc.live_snapshots(), 0);
}

#[test]
fn hidden_layers_export_in_isolation() {
    let dir = tempfile::tempdir().unwrap();
    let (mut doc, _) = nested();
    let layers = collect(&mut doc, &CancelToken::new(), None).unwrap();
    export(&mut doc, &layers, &config(Format::Png24, dir.path()), &CancelToken::new(), None).unwrap();

    // deep sits in a hidden group; only its own column is painted
    let deep = image::open(dir.path().join("deep.png")).unwrap().to_rgba8();
    assert_eq!(deep.get_pixel(3, 0).0, [9, 9, 9, 255]);
    for x in [0, 1, 2, 4] {
        assert_eq!(deep.get_pixel(x, 0).0[3], 0, "column {x} leaked into deep.png");
    }
}

#[test]
fn visible_only_skips_hidden() {
    let dir = tempfile::tempdir().unwrap();
    let (mut doc, _) = nested();
    let layers = collect(&mut doc, &CancelToken::new(), None).unwrap();
    let config = ExportConfigBuilder::new(Format::Png24, dir.path())
        .visible_only(true)
        .finalize()
        .unwrap();

    let outcome = export(&mut doc, &layers, &config, &CancelToken::new(), None).unwrap();
    assert_eq!(outcome.succeeded, 3);
    assert!(dir.path().join("inner-a.png").exists());
    assert!(!dir.path().join("deep.png").exists());
    assert!(!dir.path().join("hidden-inner.png").exists());
}

#[test]
fn duplicate_names_get_suffixes() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Foo.png"), b"taken").unwrap();

    let mut doc = MemoryDocument::new(SIZE, SIZE);
    doc.add_layer(None, "Foo", solid(0, RGBA8::new(1, 2, 3, 255))).unwrap();
    doc.add_layer(None, "Foo", solid(1, RGBA8::new(4, 5, 6, 255))).unwrap();
    let layers = collect(&mut doc, &CancelToken::new(), None).unwrap();

    let outcome = export(&mut doc, &layers, &config(Format::Png24, dir.path()), &CancelToken::new(), None).unwrap();
    assert_eq!(outcome.written, [dir.path().join("Foo-001.png"), dir.path().join("Foo-002.png")]);
    assert_eq!(fs::read(dir.path().join("Foo.png")).unwrap(), b"taken");
}

#[test]
fn prefix_and_name_are_sanitised() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = MemoryDocument::new(SIZE, SIZE);
    doc.add_layer(None, "My:Layer*Name", solid(0, RGBA8::new(1, 2, 3, 255))).unwrap();
    let layers = collect(&mut doc, &CancelToken::new(), None).unwrap();
    let config = ExportConfigBuilder::new(Format::Jpeg, dir.path())
        .prefix("v1")
        .finalize()
        .unwrap();

    let outcome = export(&mut doc, &layers, &config, &CancelToken::new(), None).unwrap();
    assert_eq!(outcome.written, [dir.path().join("v1_MyLayerName.jpg")]);
}

#[test]
fn exhausted_name_fails_only_that_layer() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Foo.tga"), b"").unwrap();
    for n in 1..=NAME_SUFFIX_LIMIT {
        fs::write(dir.path().join(format!("Foo-{n:03}.tga")), b"").unwrap();
    }

    let mut doc = MemoryDocument::new(SIZE, SIZE);
    doc.add_layer(None, "Foo", solid(0, RGBA8::new(1, 2, 3, 255))).unwrap();
    doc.add_layer(None, "Bar", solid(1, RGBA8::new(1, 2, 3, 255))).unwrap();
    let layers = collect(&mut doc, &CancelToken::new(), None).unwrap();

    let outcome = export(&mut doc, &layers, &config(Format::Targa, dir.path()), &CancelToken::new(), None).unwrap();
    assert_eq!(outcome.succeeded, 1);
    assert!(outcome.any_failure);
    assert_eq!(outcome.failed, ["Foo"]);
    assert!(dir.path().join("Bar.tga").exists());
}

#[test]
fn flattened_background_skips_isolation() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = MemoryDocument::new(SIZE, SIZE);
    doc.set_background("Background", Raster::solid(Rect::new(0, 0, SIZE, SIZE), RGBA8::new(7, 7, 7, 255)));

    let layers = collect(&mut doc, &CancelToken::new(), None).unwrap();
    doc.reset_stats();
    let outcome = export(&mut doc, &layers, &config(Format::Png24, dir.path()), &CancelToken::new(), None).unwrap();

    assert_eq!(outcome.succeeded, 1);
    assert_eq!(outcome.written, [dir.path().join("Background.png")]);
    let stats = doc.stats();
    assert_eq!(stats.visibility_writes, 0);
    assert_eq!(stats.snapshots_captured, 0);
    assert_eq!(stats.snapshots_applied, 0);
    assert_eq!(stats.encodes, 1);
}

#[test]
fn cancellation_keeps_finished_files_and_restores() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = MemoryDocument::new(SIZE, SIZE);
    for i in 0..5 {
        doc.add_layer(None, format!("l{i}"), solid(i, RGBA8::new(50, 50, 50, 255))).unwrap();
    }
    let before = doc.visibility();
    let layers = collect(&mut doc, &CancelToken::new(), None).unwrap();

    let cancel = CancelToken::new();
    let callback: ProgressCallback = {
        let cancel = cancel.clone();
        Box::new(move |progress| {
            if progress == (Progress::Exporting { completed: 2, total: 5 }) {
                cancel.cancel();
            }
        })
    };

    let outcome = export(&mut doc, &layers, &config(Format::Png24, dir.path()), &cancel, Some(&callback)).unwrap();
    assert!(cancel.is_cancelled());
    assert_eq!(outcome.attempted(), 2);
    assert_eq!(outcome.succeeded, 2);
    assert!(!outcome.any_failure);
    assert!(dir.path().join("l4.png").exists());
    assert!(dir.path().join("l3.png").exists());
    assert!(!dir.path().join("l2.png").exists());
    assert_eq!(doc.visibility(), before);
    assert_eq!(doc.live_snapshots(), 0);
}

#[test]
fn encode_failure_does_not_stop_the_loop() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = MemoryDocument::new(SIZE, SIZE);
    doc.add_layer(None, "a", solid(0, RGBA8::new(1, 1, 1, 255))).unwrap();
    doc.add_layer(None, "b", solid(1, RGBA8::new(2, 2, 2, 255))).unwrap();
    doc.add_layer(None, "c", solid(2, RGBA8::new(3, 3, 3, 255))).unwrap();
    doc.fail_encoding_for("b");
    let before = doc.visibility();

    let layers = collect(&mut doc, &CancelToken::new(), None).unwrap();
    let outcome = export(&mut doc, &layers, &config(Format::Png8, dir.path()), &CancelToken::new(), None).unwrap();

    assert_eq!(outcome.succeeded, 2);
    assert!(outcome.any_failure);
    assert_eq!(outcome.failed, ["b"]);
    assert!(dir.path().join("a.png").exists());
    assert!(dir.path().join("c.png").exists());
    assert_eq!(doc.visibility(), before);
}

#[test]
fn invalid_configuration_never_reaches_the_document() {
    let dir = tempfile::tempdir().unwrap();
    let options = Png8Options {
        color_reduction: ColorReduction::Custom,
        ..Default::default()
    };
    let err = ExportConfigBuilder::new(Format::Png8, dir.path())
        .parameters(FormatParameters::Png8(options))
        .finalize()
        .unwrap_err();
    assert!(matches!(err, ExportError::InvalidConfiguration(_)));
}

#[test]
fn destination_created_on_export() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested").join("out");
    let mut doc = MemoryDocument::new(SIZE, SIZE);
    doc.add_layer(None, "only", solid(0, RGBA8::new(1, 1, 1, 255))).unwrap();
    let layers = collect(&mut doc, &CancelToken::new(), None).unwrap();

    let outcome = export(&mut doc, &layers, &config(Format::Png24, &out), &CancelToken::new(), None).unwrap();
    assert_eq!(outcome.written, [out.join("only.png")]);
}

#[test]
fn manifest_document_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = Manifest::parse(
        r#"
width = 8
height = 8

[background]
color = [255, 255, 255]

[[layers]]
name = "Sun"
fill = [255, 200, 0, 255]
rect = [4, 0, 4, 4]

[[layers]]
name = "Scenery"
visible = false

[[layers.layers]]
name = "Hill"
fill = [0, 128, 0, 255]
rect = [0, 4, 8, 4]
"#,
    )
    .unwrap();
    let mut doc = manifest.build(dir.path()).unwrap();
    let before = doc.visibility();

    let layers = collect(&mut doc, &CancelToken::new(), None).unwrap();
    assert_eq!(names(layers.all()), ["Sun", "Hill", "Background"]);
    assert_eq!(names(layers.visible()), ["Sun", "Background"]);

    let out = dir.path().join("out");
    let outcome = export(&mut doc, &layers, &config(Format::Png24, &out), &CancelToken::new(), None).unwrap();
    assert_eq!(outcome.succeeded, 3);
    assert_eq!(doc.visibility(), before);

    let hill = image::open(out.join("Hill.png")).unwrap().to_rgba8();
    assert_eq!(hill.get_pixel(0, 7).0, [0, 128, 0, 255]);
    assert_eq!(hill.get_pixel(0, 0).0[3], 0);
}
