use std::io::Write;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use shopimg_contracts::catalog::{Catalog, Product};
use tempfile::NamedTempFile;

const IMAGE_SUBDIR: &str = "products";

/// Catalog kept in a JSON file (`{"products": [...]}`) with image bytes
/// stored under `<media_root>/products/`.
#[derive(Debug, Clone)]
pub struct JsonCatalog {
    path: PathBuf,
    media_root: PathBuf,
    products: Vec<Product>,
}

impl JsonCatalog {
    pub fn open(path: impl Into<PathBuf>, media_root: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed reading catalog {}", path.display()))?;
        let parsed: Value = serde_json::from_str(&raw)
            .with_context(|| format!("catalog {} is not valid JSON", path.display()))?;
        let rows = match &parsed {
            Value::Array(rows) => rows.clone(),
            Value::Object(obj) => obj
                .get("products")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        let products = rows
            .into_iter()
            .map(serde_json::from_value::<Product>)
            .collect::<Result<Vec<Product>, _>>()
            .with_context(|| format!("catalog {} has a malformed product", path.display()))?;
        Ok(Self {
            path,
            media_root: media_root.into(),
            products,
        })
    }

    pub fn create(
        path: impl Into<PathBuf>,
        media_root: impl Into<PathBuf>,
        products: Vec<Product>,
    ) -> Result<Self> {
        let catalog = Self {
            path: path.into(),
            media_root: media_root.into(),
            products,
        };
        catalog.flush()?;
        Ok(catalog)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn image_dir(&self) -> PathBuf {
        self.media_root.join(IMAGE_SUBDIR)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    fn flush(&self) -> Result<()> {
        let body = serde_json::to_vec_pretty(&json!({ "products": self.products }))?;
        write_atomic(&self.path, &body)
            .with_context(|| format!("failed writing catalog {}", self.path.display()))
    }
}

impl Catalog for JsonCatalog {
    fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.products.clone())
    }

    fn find_product(&self, slug: &str) -> Result<Option<Product>> {
        Ok(self
            .products
            .iter()
            .find(|product| product.slug == slug)
            .cloned())
    }

    fn save_image(&mut self, product: &Product, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        validate_filename(filename)?;
        let Some(index) = self
            .products
            .iter()
            .position(|row| row.slug == product.slug)
        else {
            bail!("product with slug '{}' not found", product.slug);
        };

        let target = self.image_dir().join(filename);
        write_atomic(&target, bytes)
            .with_context(|| format!("failed storing image {}", target.display()))?;

        let relative = format!("{IMAGE_SUBDIR}/{filename}");
        let previous = self.products[index].image.replace(relative.clone());
        if let Some(stale) = previous
            .filter(|previous| previous != &relative)
            .and_then(|previous| self.stored_image_path(&previous))
        {
            if stale.is_file() {
                if let Err(err) = std::fs::remove_file(&stale) {
                    eprintln!(
                        "warning: failed removing replaced image {}: {err}",
                        stale.display()
                    );
                }
            }
        }
        self.flush()?;
        Ok(target)
    }
}

impl JsonCatalog {
    /// Resolves a recorded `image` value to a file inside the image
    /// directory; anything else is never touched.
    fn stored_image_path(&self, recorded: &str) -> Option<PathBuf> {
        let name = recorded.strip_prefix(IMAGE_SUBDIR)?.strip_prefix('/')?;
        validate_filename(name).ok()?;
        Some(self.image_dir().join(name))
    }
}

fn validate_filename(filename: &str) -> Result<()> {
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => bail!("refusing to store image under unsafe filename '{filename}'"),
    }
}

/// Temp file in the target directory, then rename over the target, so
/// readers see either the old bytes or the new ones.
fn write_atomic(target: &Path, bytes: &[u8]) -> Result<()> {
    let dir = target
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(target).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::Path;

    use anyhow::Result;
    use shopimg_contracts::catalog::{Catalog, Product};

    use super::JsonCatalog;

    pub(crate) fn product(slug: &str, name: &str, category: &str) -> Product {
        Product {
            slug: slug.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            image: None,
        }
    }

    pub(crate) fn seeded(root: &Path) -> Result<JsonCatalog> {
        JsonCatalog::create(
            root.join("catalog.json"),
            root.join("media"),
            vec![
                product("yoga-mat", "Yoga Mat", "Sports & Outdoors"),
                product("unknown-item", "Unknown Item", "Electronics"),
                product("science-fiction-novel", "Science Fiction Novel", "Books"),
            ],
        )
    }

    #[test]
    fn open_reads_what_create_wrote() -> Result<()> {
        let temp = tempfile::tempdir()?;
        seeded(temp.path())?;
        let catalog =
            JsonCatalog::open(temp.path().join("catalog.json"), temp.path().join("media"))?;
        assert_eq!(catalog.list_products()?.len(), 3);
        assert_eq!(
            catalog.find_product("yoga-mat")?.map(|p| p.name),
            Some("Yoga Mat".to_string())
        );
        assert_eq!(catalog.find_product("missing")?, None);
        Ok(())
    }

    #[test]
    fn open_accepts_bare_array() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"[{"slug": "water-bottle", "name": "Water Bottle", "category": "Sports & Outdoors"}]"#,
        )?;
        let catalog = JsonCatalog::open(&path, temp.path())?;
        assert_eq!(catalog.products().len(), 1);
        Ok(())
    }

    #[test]
    fn save_image_replaces_previous_bytes_and_records_path() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let mut catalog = seeded(temp.path())?;
        let product = product("yoga-mat", "Yoga Mat", "Sports & Outdoors");

        let target = catalog.save_image(&product, "yoga-mat.jpg", b"first")?;
        catalog.save_image(&product, "yoga-mat.jpg", b"second")?;

        assert_eq!(std::fs::read(&target)?, b"second".to_vec());
        let entries = std::fs::read_dir(catalog.image_dir())?.count();
        assert_eq!(entries, 1);

        let reopened =
            JsonCatalog::open(temp.path().join("catalog.json"), temp.path().join("media"))?;
        assert_eq!(
            reopened.find_product("yoga-mat")?.and_then(|p| p.image),
            Some("products/yoga-mat.jpg".to_string())
        );
        Ok(())
    }

    #[test]
    fn save_image_rejects_path_traversal_and_unknown_products() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let mut catalog = seeded(temp.path())?;
        let known = product("yoga-mat", "Yoga Mat", "Sports & Outdoors");
        assert!(catalog.save_image(&known, "../escape.jpg", b"x").is_err());
        assert!(catalog.save_image(&known, "nested/yoga.jpg", b"x").is_err());

        let ghost = product("ghost", "Ghost", "Books");
        assert!(catalog.save_image(&ghost, "ghost.jpg", b"x").is_err());
        assert!(!catalog.image_dir().join("ghost.jpg").exists());
        Ok(())
    }

    #[test]
    fn save_image_only_removes_previous_images_inside_the_store() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let outside = temp.path().join("precious.txt");
        let sibling = temp.path().join("media").join("notes.txt");
        let old_image = temp.path().join("media").join("products").join("old.jpg");
        std::fs::create_dir_all(old_image.parent().unwrap_or(temp.path()))?;
        std::fs::write(&outside, b"keep")?;
        std::fs::write(&sibling, b"keep")?;
        std::fs::write(&old_image, b"old")?;

        let mut absolute = product("yoga-mat", "Yoga Mat", "Sports & Outdoors");
        absolute.image = Some(outside.to_string_lossy().to_string());
        let mut dotted = product("unknown-item", "Unknown Item", "Electronics");
        dotted.image = Some("products/../notes.txt".to_string());
        let mut stored = product("science-fiction-novel", "Science Fiction Novel", "Books");
        stored.image = Some("products/old.jpg".to_string());
        let mut catalog = JsonCatalog::create(
            temp.path().join("catalog.json"),
            temp.path().join("media"),
            vec![absolute.clone(), dotted.clone(), stored.clone()],
        )?;

        catalog.save_image(&absolute, "yoga-mat.jpg", b"new")?;
        catalog.save_image(&dotted, "unknown-item.jpg", b"new")?;
        catalog.save_image(&stored, "science-fiction-novel.jpg", b"new")?;

        assert!(outside.exists());
        assert!(sibling.exists());
        assert!(!old_image.exists());
        assert_eq!(
            catalog.find_product("unknown-item")?.and_then(|p| p.image),
            Some("products/unknown-item.jpg".to_string())
        );
        Ok(())
    }
}
