//! Recipe handlers. Every query is scoped to the authenticated user.

use std::path::Path;

use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, State, multipart::Field},
};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::response::ApiResponse;
use crate::api::state::AppState;
use crate::auth::CurrentUser;
use crate::recipe::{NewRecipe, Recipe};

/// Image extensions accepted for upload.
const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// List the caller's recipes.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_recipes(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<ApiResponse<Vec<Recipe>>>> {
    let recipes = state.recipes.list_for_user(&user.id).await?;
    Ok(Json(ApiResponse::data(recipes)))
}

struct UploadedImage {
    extension: String,
    bytes: Bytes,
}

#[derive(Default)]
struct RecipeForm {
    name: Option<String>,
    cookbook: Option<String>,
    page_number: Option<String>,
    image: Option<UploadedImage>,
}

impl RecipeForm {
    async fn from_multipart(multipart: &mut Multipart) -> ApiResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::validation(format!("Invalid multipart body: {e}")))?
        {
            let Some(field_name) = field.name().map(str::to_string) else {
                continue;
            };

            match field_name.as_str() {
                "name" => form.name = Some(read_text(field).await?),
                "cookbook" => form.cookbook = Some(read_text(field).await?),
                "pagenumber" => form.page_number = Some(read_text(field).await?),
                "image" => {
                    let file_name = field.file_name().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::validation(format!("Invalid image upload: {e}")))?;
                    // Browsers send an empty part when no file was chosen.
                    if bytes.is_empty() {
                        continue;
                    }
                    let extension = image_extension(file_name.as_deref())?;
                    form.image = Some(UploadedImage { extension, bytes });
                }
                other => debug!("Ignoring unknown multipart field '{}'", other),
            }
        }

        Ok(form)
    }

    fn into_parts(self) -> ApiResult<(String, String, i64, Option<UploadedImage>)> {
        let name = required(self.name, "name")?;
        let cookbook = required(self.cookbook, "cookbook")?;
        let page_number = required(self.page_number, "pagenumber")?
            .parse::<i64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ApiError::validation("pagenumber must be a positive integer"))?;

        Ok((name, cookbook, page_number, self.image))
    }
}

async fn read_text(field: Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid form field: {e}")))
}

fn required(value: Option<String>, field: &str) -> ApiResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation(format!("{field} is required")))
}

/// Create a recipe for the caller, storing the optional image under
/// `images/<user id>/` in a file no other recipe refers to.
#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
pub async fn create_recipe(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> ApiResult<Json<ApiResponse<Recipe>>> {
    let (name, cookbook, page_number, image) =
        RecipeForm::from_multipart(&mut multipart).await?.into_parts()?;

    if state.recipes.exists_for_user(&user.id, &name).await? {
        return Err(ApiError::conflict(format!(
            "Recipe '{}' already exists.",
            name
        )));
    }

    let stored_image = match image {
        Some(image) => Some(store_image(&state.images_dir(), &user.id, &name, image).await?),
        None => None,
    };

    let created = state
        .recipes
        .create(
            &user.id,
            NewRecipe {
                name,
                cookbook,
                page_number,
                image: stored_image.as_ref().map(|(_, url)| url.clone()),
            },
        )
        .await;

    let recipe = match created {
        Ok(recipe) => recipe,
        Err(e) => {
            if let Some((path, _)) = &stored_image {
                if let Err(remove_err) = fs::remove_file(path).await {
                    warn!("Failed to remove orphaned image {}: {}", path.display(), remove_err);
                }
            }
            return Err(e.into());
        }
    };

    info!(recipe_id = %recipe.id, "Created recipe");

    Ok(Json(ApiResponse::data(recipe)))
}

/// Write the image to disk. Returns the file path and its public URL.
///
/// Distinct names can share a slug, so every file gets a random suffix
/// and is created exclusively.
async fn store_image(
    images_dir: &Path,
    user_id: &str,
    recipe_name: &str,
    image: UploadedImage,
) -> ApiResult<(std::path::PathBuf, String)> {
    let file_name = image_file_name(recipe_name, &image.extension);
    let dir = images_dir.join(user_id);

    fs::create_dir_all(&dir).await.map_err(|e| {
        error!("Failed to create image directory {}: {}", dir.display(), e);
        ApiError::internal(format!("creating image directory: {e}"))
    })?;

    let path = dir.join(&file_name);
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
        .map_err(|e| {
            error!("Failed to create image {}: {}", path.display(), e);
            ApiError::internal(format!("creating image: {e}"))
        })?;

    if let Err(e) = write_all(&mut file, &image.bytes).await {
        error!("Failed to write image {}: {}", path.display(), e);
        drop(file);
        if let Err(remove_err) = fs::remove_file(&path).await {
            warn!("Failed to remove partial image {}: {}", path.display(), remove_err);
        }
        return Err(ApiError::internal(format!("writing image: {e}")));
    }

    debug!("Stored {} bytes at {}", image.bytes.len(), path.display());

    Ok((path, format!("/public/images/{user_id}/{file_name}")))
}

async fn write_all(file: &mut fs::File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await
}

/// `<slug>-<12 hex chars>.<ext>`
fn image_file_name(recipe_name: &str, extension: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}.{}", slugify(recipe_name), &suffix[..12], extension)
}

/// Lowercase, hyphen-separated, ASCII alphanumerics only.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if (c.is_whitespace() || c == '-' || c == '_') && !slug.ends_with('-') {
            slug.push('-');
        }
    }

    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "recipe".to_string()
    } else {
        slug.to_string()
    }
}

fn image_extension(file_name: Option<&str>) -> ApiResult<String> {
    let extension = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()));

    extension.ok_or_else(|| {
        ApiError::validation(format!(
            "image must be one of: {}",
            ALLOWED_IMAGE_EXTENSIONS.join(", ")
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Grandma's Apple Pie"), "grandmas-apple-pie");
        assert_eq!(slugify("  Pad   Thai  "), "pad-thai");
        assert_eq!(slugify("crème brûlée"), "crme-brle");
        assert_eq!(slugify("../../etc/passwd"), "etcpasswd");
        assert_eq!(slugify("!!!"), "recipe");
    }

    #[test]
    fn test_image_file_names_are_unique_per_upload() {
        let first = image_file_name("Soup", "png");
        let second = image_file_name("soup!", "png");

        assert!(first.starts_with("soup-"));
        assert!(first.ends_with(".png"));
        assert_eq!(first.len(), "soup-".len() + 12 + ".png".len());
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_store_image_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let image = |bytes: &'static [u8]| UploadedImage {
            extension: "png".to_string(),
            bytes: Bytes::from_static(bytes),
        };

        let (first_path, first_url) = store_image(dir.path(), "user-1", "Soup", image(b"FIRST"))
            .await
            .unwrap();
        let (second_path, second_url) =
            store_image(dir.path(), "user-1", "soup!", image(b"SECOND"))
                .await
                .unwrap();

        assert_ne!(first_path, second_path);
        assert_ne!(first_url, second_url);
        assert!(first_url.starts_with("/public/images/user-1/soup-"));
        assert_eq!(std::fs::read(first_path).unwrap(), b"FIRST");
        assert_eq!(std::fs::read(second_path).unwrap(), b"SECOND");
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension(Some("photo.JPG")).unwrap(), "jpg");
        assert_eq!(image_extension(Some("dish.webp")).unwrap(), "webp");
        assert!(image_extension(Some("script.sh")).is_err());
        assert!(image_extension(Some("noextension")).is_err());
        assert!(image_extension(None).is_err());
    }

    #[test]
    fn test_required_fields() {
        assert_eq!(required(Some(" Soup ".into()), "name").unwrap(), "Soup");
        assert!(required(Some("   ".into()), "name").is_err());
        assert!(required(None, "name").is_err());
    }

    #[test]
    fn test_page_number_validation() {
        let form = RecipeForm {
            name: Some("Soup".into()),
            cookbook: Some("Winter".into()),
            page_number: Some("abc".into()),
            image: None,
        };
        assert!(matches!(form.into_parts(), Err(ApiError::Validation(_))));

        let form = RecipeForm {
            name: Some("Soup".into()),
            cookbook: Some("Winter".into()),
            page_number: Some("12".into()),
            image: None,
        };
        let (_, _, page, _) = form.into_parts().unwrap();
        assert_eq!(page, 12);
    }
}
