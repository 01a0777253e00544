use crate::error::ExportError;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use fs_err as fs;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use stylepack_hash::{sha256_hex, short_hex};
use stylepack_types::item::metadata_keys;
use stylepack_types::manifest::{AssetEntry, Manifest, PACKAGE_FORMAT_VERSION, layout};
use stylepack_types::{Category, ChangeType, ScanResult, ScannedItem, schema};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Also package items classified `default`.
    pub include_defaults: bool,
    /// Copy referenced files into `assets/`. When off, assets are only
    /// inventoried and the owning items are marked `asset_missing`.
    pub include_binary_assets: bool,
    pub created_at: DateTime<Utc>,
}

impl ExportOptions {
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            include_defaults: false,
            include_binary_assets: true,
            created_at,
        }
    }
}

/// Writes `scan` as a package archive at `destination`.
///
/// The archive is assembled in a temporary file next to `destination` and
/// renamed into place only after it is complete; on error nothing is left
/// at `destination`.
pub fn export(
    scan: &ScanResult,
    destination: &Utf8Path,
    opts: &ExportOptions,
) -> Result<Manifest, ExportError> {
    let package_id = Uuid::new_v4().to_string();

    let mut items: Vec<ScannedItem> = scan
        .items
        .iter()
        .filter(|i| opts.include_defaults || i.change_type != ChangeType::Default)
        .cloned()
        .collect();
    items.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    let mut inventory = AssetInventory::default();
    for item in items.iter_mut() {
        if item.associated_files.is_empty() {
            continue;
        }
        if opts.include_binary_assets {
            for original in &item.associated_files {
                inventory.store(item.category, original)?;
            }
        } else {
            for original in &item.associated_files {
                inventory.record_only(item.category, original);
            }
            item.metadata.insert(
                metadata_keys::ASSET_MISSING.to_string(),
                serde_json::Value::Bool(true),
            );
        }
    }

    let filtered = ScanResult {
        schema: scan.schema.clone(),
        scan_id: scan.scan_id.clone(),
        os_build: scan.os_build,
        created_at: scan.created_at,
        summary: ScanResult::count_by_category(&items),
        items,
        errors: scan.errors.clone(),
        warnings: scan.warnings.clone(),
    };

    let manifest = Manifest {
        schema: schema::STYLEPACK_MANIFEST_V1.to_string(),
        format_version: PACKAGE_FORMAT_VERSION,
        package_id,
        scan_id: scan.scan_id.clone(),
        os_build: scan.os_build,
        created_at: opts.created_at,
        include_defaults: opts.include_defaults,
        include_binary_assets: opts.include_binary_assets,
        items_by_category: filtered.summary.clone(),
        assets: inventory.entries.into_values().collect(),
    };

    let mut entries: BTreeMap<String, Vec<u8>> = inventory.blobs;
    entries.insert(
        layout::MANIFEST.to_string(),
        serde_json::to_vec_pretty(&manifest).map_err(|source| ExportError::Serialize {
            what: "manifest",
            source,
        })?,
    );
    entries.insert(
        layout::SCAN.to_string(),
        serde_json::to_vec_pretty(&filtered).map_err(|source| ExportError::Serialize {
            what: "scan result",
            source,
        })?,
    );

    write_archive(destination, &entries, opts.created_at)?;

    info!(
        path = %destination,
        package_id = %manifest.package_id,
        items = manifest.item_count(),
        assets = manifest.assets.len(),
        "package exported"
    );
    Ok(manifest)
}

#[derive(Default)]
struct AssetInventory {
    /// Keyed by (category, original path) so every reference is listed once.
    entries: BTreeMap<(Category, Utf8PathBuf), AssetEntry>,
    /// Archive name -> bytes.
    blobs: BTreeMap<String, Vec<u8>>,
    /// Content hash -> archive name.
    by_hash: BTreeMap<String, String>,
    names: BTreeSet<String>,
}

impl AssetInventory {
    fn store(&mut self, category: Category, original: &Utf8Path) -> Result<(), ExportError> {
        let key = (category, original.to_path_buf());
        if self.entries.contains_key(&key) {
            return Ok(());
        }

        let bytes = fs::read(original).map_err(|e| ExportError::io(original, e))?;
        let sha = sha256_hex(&bytes);
        let size = bytes.len() as u64;

        let rel_path = match self.by_hash.get(&sha) {
            Some(existing) => existing.clone(),
            None => {
                let name = self.unique_name(category, original, &sha);
                debug!(original = %original, rel_path = %name, "asset stored");
                self.names.insert(name.clone());
                self.by_hash.insert(sha.clone(), name.clone());
                self.blobs.insert(name.clone(), bytes);
                name
            }
        };

        self.entries.insert(
            key,
            AssetEntry {
                category,
                original_path: original.to_path_buf(),
                rel_path: Some(rel_path),
                sha256: Some(sha),
                size_bytes: Some(size),
            },
        );
        Ok(())
    }

    fn record_only(&mut self, category: Category, original: &Utf8Path) {
        self.entries
            .entry((category, original.to_path_buf()))
            .or_insert_with(|| AssetEntry {
                category,
                original_path: original.to_path_buf(),
                rel_path: None,
                sha256: None,
                size_bytes: None,
            });
    }

    fn unique_name(&self, category: Category, original: &Utf8Path, sha: &str) -> String {
        let base = sanitize_basename(original.as_str());
        let plain = format!("{}/{}/{}", layout::ASSETS_DIR, category, base);
        if !self.names.contains(&plain) {
            return plain;
        }
        let (stem, ext) = match base.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (base.as_str(), None),
        };
        let hashed = match ext {
            Some(ext) => format!("{stem}_{}.{ext}", short_hex(sha, 8)),
            None => format!("{stem}_{}", short_hex(sha, 8)),
        };
        format!("{}/{}/{}", layout::ASSETS_DIR, category, hashed)
    }
}

/// Final path component of `path` (either separator style), reduced to a
/// portable character set.
pub fn sanitize_basename(path: &str) -> String {
    let base = path.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "asset".to_string()
    } else {
        trimmed.to_string()
    }
}

fn write_archive(
    destination: &Utf8Path,
    entries: &BTreeMap<String, Vec<u8>>,
    created_at: DateTime<Utc>,
) -> Result<(), ExportError> {
    let parent = match destination.parent() {
        Some(p) if p.as_str().is_empty() => Utf8Path::new("."),
        Some(p) => p,
        None => return Err(ExportError::InvalidDestination(destination.to_path_buf())),
    };
    fs::create_dir_all(parent).map_err(|e| ExportError::io(parent, e))?;

    let tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| ExportError::io(parent, e))?;
    let mtime = created_at.timestamp().max(0) as u64;

    let encoder = GzEncoder::new(tmp.as_file(), Compression::default());
    let mut archive = tar::Builder::new(encoder);
    for (name, bytes) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_mode(0o644);
        header.set_size(bytes.len() as u64);
        header.set_mtime(mtime);
        header.set_cksum();
        archive
            .append_data(&mut header, name, bytes.as_slice())
            .map_err(|e| ExportError::io(destination, e))?;
    }
    let mut encoder = archive
        .into_inner()
        .map_err(|e| ExportError::io(destination, e))?;
    encoder.flush().map_err(|e| ExportError::io(destination, e))?;
    encoder.finish().map_err(|e| ExportError::io(destination, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| ExportError::io(destination, e))?;

    tmp.persist(destination)
        .map_err(|e| ExportError::io(destination, e.error))?;
    Ok(())
}
