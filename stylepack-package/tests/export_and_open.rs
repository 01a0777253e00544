use camino::{Utf8Path, Utf8PathBuf};
use chrono::{TimeZone, Utc};
use fs_err as fs;
use pretty_assertions::assert_eq;
use std::collections::{BTreeMap, BTreeSet};
use stylepack_hash::sha256_hex;
use stylepack_package::{ExportError, ExportOptions, Package, PackageError, export};
use stylepack_types::{Category, ChangeType, ConfigValue, OsBuild, ScanResult, ScannedItem, schema};
use tempfile::TempDir;

fn utf8(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp path")
}

fn item(category: Category, key: &str, change: ChangeType, files: &[&Utf8Path]) -> ScannedItem {
    ScannedItem {
        key: key.to_string(),
        category,
        current_value: Some(ConfigValue::String(
            files.first().map(|f| f.to_string()).unwrap_or_else(|| "v".into()),
        )),
        default_value: None,
        change_type: change,
        associated_files: files.iter().map(|f| f.to_path_buf()).collect::<BTreeSet<_>>(),
        source: None,
        metadata: BTreeMap::new(),
    }
}

fn scan(items: Vec<ScannedItem>) -> ScanResult {
    ScanResult {
        schema: schema::STYLEPACK_SCAN_V1.to_string(),
        scan_id: "scan-1".into(),
        os_build: OsBuild(22631),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        summary: ScanResult::count_by_category(&items),
        items,
        errors: vec![],
        warnings: vec![],
    }
}

fn opts(include_binary_assets: bool) -> ExportOptions {
    ExportOptions {
        include_defaults: false,
        include_binary_assets,
        created_at: Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap(),
    }
}

struct Fixture {
    _src: TempDir,
    out: TempDir,
    a: Utf8PathBuf,
    b: Utf8PathBuf,
    dup: Utf8PathBuf,
}

/// Two distinct files with the same basename and one byte-identical copy.
fn fixture() -> Fixture {
    let src = TempDir::new().unwrap();
    let root = utf8(&src);
    fs::create_dir_all(root.join("one")).unwrap();
    fs::create_dir_all(root.join("two")).unwrap();
    let a = root.join("one/sky.jpg");
    let b = root.join("two/sky.jpg");
    let dup = root.join("two/copy-of-sky.jpg");
    fs::write(&a, b"blue sky").unwrap();
    fs::write(&b, b"grey sky").unwrap();
    fs::write(&dup, b"blue sky").unwrap();
    Fixture {
        _src: src,
        out: TempDir::new().unwrap(),
        a,
        b,
        dup,
    }
}

#[test]
fn every_manifest_asset_resolves_to_matching_content() {
    let fx = fixture();
    let result = scan(vec![
        item(Category::Wallpaper, "wallpaper.desktop.path", ChangeType::Modified, &[&fx.a]),
        item(Category::Wallpaper, "wallpaper.lockscreen.path", ChangeType::Added, &[&fx.b]),
        item(Category::Wallpaper, "wallpaper.slideshow.path", ChangeType::Added, &[&fx.dup]),
        item(Category::Theme, "theme.darkMode", ChangeType::Default, &[]),
    ]);
    let dest = utf8(&fx.out).join("pack.tar.gz");

    let manifest = export(&result, &dest, &opts(true)).expect("export");
    assert!(dest.is_file());

    let package = Package::open(&dest).expect("open");
    assert_eq!(package.manifest(), &manifest);
    for asset in &manifest.assets {
        let rel = asset.rel_path.as_deref().expect("stored");
        let bytes = package.asset(rel).expect("asset present");
        assert_eq!(Some(sha256_hex(bytes)), asset.sha256);
    }

    // Identical content is stored once; distinct content never overwrites.
    let names: Vec<&str> = package.asset_names().collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"assets/wallpaper/sky.jpg"));
    let suffixed = format!("assets/wallpaper/sky_{}.jpg", &sha256_hex(b"grey sky")[..8]);
    assert!(names.contains(&suffixed.as_str()));

    // Default items are dropped unless requested.
    assert!(package.scan().find(Category::Theme, "theme.darkMode").is_none());
    assert_eq!(manifest.items_by_category.get(&Category::Theme), None);
    assert_eq!(manifest.items_by_category.get(&Category::Wallpaper), Some(&3));
    assert_eq!(manifest.assets.len(), 3);
    assert_eq!(package.manifest().format_version, 1);
}

#[test]
fn excluded_assets_are_inventoried_and_flagged() {
    let fx = fixture();
    let result = scan(vec![item(
        Category::Wallpaper,
        "wallpaper.desktop.path",
        ChangeType::Modified,
        &[&fx.a],
    )]);
    let dest = utf8(&fx.out).join("pack.tar.gz");

    let manifest = export(&result, &dest, &opts(false)).expect("export");
    assert_eq!(manifest.assets.len(), 1);
    assert_eq!(manifest.assets[0].original_path, fx.a);
    assert!(manifest.assets[0].rel_path.is_none());

    let package = Package::open(&dest).expect("open");
    assert_eq!(package.asset_names().count(), 0);
    assert!(package.scan().items[0].is_asset_missing());
}

#[test]
fn failed_export_leaves_nothing_behind() {
    let fx = fixture();
    let missing = utf8(&fx.out).join("gone.png");
    let result = scan(vec![item(
        Category::Wallpaper,
        "wallpaper.desktop.path",
        ChangeType::Modified,
        &[&missing],
    )]);
    let out_dir = utf8(&fx.out).join("dist");
    let dest = out_dir.join("pack.tar.gz");

    let err = export(&result, &dest, &opts(true)).unwrap_err();
    assert!(matches!(err, ExportError::Io { .. }));
    assert!(!dest.exists());
    let leftovers = if out_dir.exists() {
        fs::read_dir(&out_dir).unwrap().count()
    } else {
        0
    };
    assert_eq!(leftovers, 0);
}

#[test]
fn directory_package_opens_like_archive() {
    let fx = fixture();
    let dir = utf8(&fx.out).join("unpacked");
    fs::create_dir_all(dir.join("assets/wallpaper")).unwrap();
    fs::write(dir.join("assets/wallpaper/sky.jpg"), b"blue sky").unwrap();

    let result = scan(vec![]);
    let manifest = serde_json::json!({
        "schema": "stylepack.manifest.v1",
        "format_version": 1,
        "package_id": "p-1",
        "scan_id": "scan-1",
        "os_build": 22631,
        "created_at": "2024-05-02T00:00:00Z",
        "assets": [{
            "category": "wallpaper",
            "original_path": "/x/sky.jpg",
            "rel_path": "assets/wallpaper/sky.jpg",
            "sha256": sha256_hex(b"blue sky"),
        }],
    });
    fs::write(dir.join("manifest.json"), manifest.to_string()).unwrap();
    fs::write(dir.join("scan.json"), serde_json::to_string(&result).unwrap()).unwrap();

    let package = Package::open(&dir).expect("open dir");
    assert_eq!(package.package_id(), "p-1");
    assert_eq!(package.asset("assets/wallpaper/sky.jpg"), Some(&b"blue sky"[..]));

    // Tampering with the asset is detected.
    fs::write(dir.join("assets/wallpaper/sky.jpg"), b"red sky").unwrap();
    let err = Package::open(&dir).unwrap_err();
    match err {
        PackageError::Corrupt { reason } => assert!(reason.contains("hash mismatch")),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn garbage_archive_is_corrupt() {
    let out = TempDir::new().unwrap();
    let dest = utf8(&out).join("bad.tar.gz");
    fs::write(&dest, b"definitely not gzip").unwrap();
    assert!(matches!(
        Package::open(&dest),
        Err(PackageError::Corrupt { .. })
    ));
}

#[cfg(unix)]
#[test]
fn directory_package_ignores_symlinked_assets() {
    let fx = fixture();
    let dir = utf8(&fx.out).join("unpacked");
    fs::create_dir_all(dir.join("assets/wallpaper")).unwrap();
    fs::write(dir.join("assets/wallpaper/sky.jpg"), b"blue sky").unwrap();
    std::os::unix::fs::symlink(&fx.b, dir.join("assets/wallpaper/outside.jpg")).unwrap();
    std::os::unix::fs::symlink(fx.a.parent().unwrap(), dir.join("assets/linked")).unwrap();

    let manifest = serde_json::json!({
        "schema": "stylepack.manifest.v1",
        "format_version": 1,
        "package_id": "p-2",
        "scan_id": "scan-1",
        "os_build": 22631,
        "created_at": "2024-05-02T00:00:00Z",
        "assets": [],
    });
    fs::write(dir.join("manifest.json"), manifest.to_string()).unwrap();
    fs::write(dir.join("scan.json"), serde_json::to_string(&scan(vec![])).unwrap()).unwrap();

    let package = Package::open(&dir).expect("open dir");
    let names: Vec<&str> = package.asset_names().collect();
    assert_eq!(names, vec!["assets/wallpaper/sky.jpg"]);
}

#[test]
fn default_items_are_kept_when_requested() {
    let fx = fixture();
    let result = scan(vec![
        item(Category::Theme, "theme.darkMode", ChangeType::Default, &[]),
        item(Category::Wallpaper, "wallpaper.desktop.path", ChangeType::Modified, &[&fx.a]),
    ]);
    let dest = utf8(&fx.out).join("pack.tar.gz");
    let mut o = opts(true);
    o.include_defaults = true;

    let manifest = export(&result, &dest, &o).expect("export");
    assert!(manifest.include_defaults);
    assert_eq!(manifest.items_by_category.get(&Category::Theme), Some(&1));
    assert_eq!(manifest.item_count(), 2);

    let package = Package::open(&dest).expect("open");
    let kept = package
        .scan()
        .find(Category::Theme, "theme.darkMode")
        .expect("default item exported");
    assert_eq!(kept.change_type, ChangeType::Default);
    assert_eq!(package.scan().summary.get(&Category::Theme), Some(&1));
}
