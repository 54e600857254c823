use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use shopimg_contracts::errors::ImageFailure;

/// Raster extensions probed for custom images, in priority order.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

/// Image files directly inside `dir`, grouped by extension priority and
/// sorted by name within each group.
pub fn scan_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("failed scanning {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && extension_rank(&path).is_some() {
            found.push(path);
        }
    }
    found.sort_by(|a, b| {
        extension_rank(a)
            .cmp(&extension_rank(b))
            .then_with(|| a.file_name().cmp(&b.file_name()))
    });
    Ok(found)
}

fn extension_rank(path: &Path) -> Option<usize> {
    let ext = path.extension()?.to_str()?;
    IMAGE_EXTENSIONS.iter().position(|candidate| *candidate == ext)
}

pub fn find_image_file(dir: &Path, base_name: &str) -> Option<PathBuf> {
    IMAGE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{base_name}.{ext}")))
        .find(|path| path.is_file())
}

/// First candidate basename (declared order) with a matching file wins.
pub fn find_custom_image(
    dir: &Path,
    slug: &str,
    candidates: &[String],
) -> Result<PathBuf, ImageFailure> {
    candidates
        .iter()
        .find_map(|name| find_image_file(dir, name))
        .ok_or_else(|| {
            let tried = candidates
                .iter()
                .map(|name| format!("{name}.*"))
                .collect::<Vec<String>>()
                .join(", ");
            ImageFailure::file_lookup(format!("no image found for {slug} (tried: {tried})"))
        })
}

/// Filenames users are asked to provide when nothing was found.
pub fn expected_filenames<'a, I>(candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = (&'a str, &'a [String])>,
{
    candidates
        .into_iter()
        .filter_map(|(_, names)| names.first())
        .map(|name| format!("{name}.png (or .jpg)"))
        .collect()
}
