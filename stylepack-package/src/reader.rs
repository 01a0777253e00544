use crate::error::PackageError;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;
use fs_err as fs;
use std::collections::BTreeMap;
use std::io::Read;
use stylepack_hash::sha256_hex;
use stylepack_types::manifest::{Manifest, PACKAGE_FORMAT_VERSION, layout};
use stylepack_types::{ScanResult, schema};
use tracing::debug;

/// A verified, read-only package held in memory.
#[derive(Debug, Clone)]
pub struct Package {
    origin: Utf8PathBuf,
    manifest: Manifest,
    scan: ScanResult,
    entries: BTreeMap<String, Vec<u8>>,
}

impl Package {
    /// Opens a `.tar.gz` package or an unpacked package directory.
    pub fn open(path: &Utf8Path) -> Result<Package, PackageError> {
        let entries = if path.is_dir() {
            read_dir_entries(path)?
        } else {
            read_archive_entries(path)?
        };
        Package::from_entries(path.to_path_buf(), entries)
    }

    /// Parses and verifies a name-indexed set of entries.
    pub fn from_entries(
        origin: Utf8PathBuf,
        entries: BTreeMap<String, Vec<u8>>,
    ) -> Result<Package, PackageError> {
        let manifest_bytes = entries
            .get(layout::MANIFEST)
            .ok_or_else(|| PackageError::corrupt("manifest.json is missing"))?;
        let manifest: Manifest = serde_json::from_slice(manifest_bytes)
            .map_err(|e| PackageError::corrupt(format!("manifest.json is unreadable: {e}")))?;

        if manifest.schema != schema::STYLEPACK_MANIFEST_V1 {
            return Err(PackageError::corrupt(format!(
                "unexpected manifest schema '{}'",
                manifest.schema
            )));
        }
        if manifest.format_version != PACKAGE_FORMAT_VERSION {
            return Err(PackageError::corrupt(format!(
                "unsupported package format version {}",
                manifest.format_version
            )));
        }

        let scan_bytes = entries
            .get(layout::SCAN)
            .ok_or_else(|| PackageError::corrupt("scan.json is missing"))?;
        let scan: ScanResult = serde_json::from_slice(scan_bytes)
            .map_err(|e| PackageError::corrupt(format!("scan.json is unreadable: {e}")))?;

        for asset in manifest.stored_assets() {
            let (Some(rel), Some(expected)) = (&asset.rel_path, &asset.sha256) else {
                return Err(PackageError::corrupt(format!(
                    "asset {} has a path but no hash",
                    asset.original_path
                )));
            };
            if !is_asset_name(rel) {
                return Err(PackageError::corrupt(format!(
                    "asset path '{rel}' escapes the assets directory"
                )));
            }
            let bytes = entries
                .get(rel)
                .ok_or_else(|| PackageError::corrupt(format!("stored asset '{rel}' is missing")))?;
            let actual = sha256_hex(bytes);
            if &actual != expected {
                return Err(PackageError::corrupt(format!(
                    "hash mismatch for '{rel}': manifest {expected}, content {actual}"
                )));
            }
        }

        debug!(
            origin = %origin,
            package_id = %manifest.package_id,
            entries = entries.len(),
            "package verified"
        );

        Ok(Package {
            origin,
            manifest,
            scan,
            entries,
        })
    }

    pub fn origin(&self) -> &Utf8Path {
        &self.origin
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn scan(&self) -> &ScanResult {
        &self.scan
    }

    pub fn package_id(&self) -> &str {
        &self.manifest.package_id
    }

    /// Bytes of an entry under `assets/`.
    pub fn asset(&self, rel_path: &str) -> Option<&[u8]> {
        if !is_asset_name(rel_path) {
            return None;
        }
        self.entries.get(rel_path).map(Vec::as_slice)
    }

    /// Names of every entry under `assets/`, sorted.
    pub fn asset_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .keys()
            .map(String::as_str)
            .filter(|n| is_asset_name(n))
    }
}

fn is_asset_name(name: &str) -> bool {
    let path = Utf8Path::new(name);
    let mut components = path.components();
    matches!(components.next(), Some(Utf8Component::Normal(first)) if first == layout::ASSETS_DIR)
        && components.clone().next().is_some()
        && components.all(|c| matches!(c, Utf8Component::Normal(_)))
}

fn normalize_entry_name(raw: &str) -> String {
    raw.trim_start_matches("./").replace('\\', "/")
}

fn read_archive_entries(path: &Utf8Path) -> Result<BTreeMap<String, Vec<u8>>, PackageError> {
    let file = fs::File::open(path).map_err(|e| PackageError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let corrupt = |e: std::io::Error| PackageError::corrupt(format!("unreadable archive: {e}"));

    let mut out = BTreeMap::new();
    for entry in archive.entries().map_err(corrupt)? {
        let mut entry = entry.map_err(corrupt)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = {
            let p = entry.path().map_err(corrupt)?;
            normalize_entry_name(&p.to_string_lossy())
        };
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes).map_err(corrupt)?;
        out.insert(name, bytes);
    }
    Ok(out)
}

fn read_dir_entries(root: &Utf8Path) -> Result<BTreeMap<String, Vec<u8>>, PackageError> {
    let mut out = BTreeMap::new();
    for name in [layout::MANIFEST, layout::SCAN] {
        let p = root.join(name);
        if p.is_file() {
            let bytes = fs::read(&p).map_err(|e| PackageError::Io { path: p, source: e })?;
            out.insert(name.to_string(), bytes);
        }
    }
    let assets = root.join(layout::ASSETS_DIR);
    if assets.is_dir() {
        walk(&assets, layout::ASSETS_DIR, &mut out)?;
    }
    Ok(out)
}

fn walk(
    dir: &Utf8Path,
    prefix: &str,
    out: &mut BTreeMap<String, Vec<u8>>,
) -> Result<(), PackageError> {
    let io = |path: &Utf8Path, e: std::io::Error| PackageError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    for entry in fs::read_dir(dir).map_err(|e| io(dir, e))? {
        let entry = entry.map_err(|e| io(dir, e))?;
        let path = Utf8PathBuf::from_path_buf(entry.path())
            .map_err(|p| PackageError::corrupt(format!("non UTF-8 path {}", p.display())))?;
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let name = format!("{prefix}/{file_name}");
        let file_type = entry.file_type().map_err(|e| io(&path, e))?;
        if file_type.is_symlink() {
            debug!(path = %path, "symlink in package directory ignored");
        } else if file_type.is_dir() {
            walk(&path, &name, out)?;
        } else if file_type.is_file() {
            let bytes = fs::read(&path).map_err(|e| io(&path, e))?;
            out.insert(name, bytes);
        }
    }
    Ok(())
}
