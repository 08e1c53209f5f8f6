//! Browser-based storage and downloads using Web APIs

use wasm_bindgen::prelude::*;
use web_sys::{Blob, HtmlAnchorElement, Storage, Url};

use spanlink_core::persistence::{assign_record_ids, sanitize_document};
use spanlink_core::{Document, Error, LoadedProject, ProjectConfig, ProjectStore, Result};

/// Trigger a browser download of `content`
pub fn download(filename: &str, content: &str, mime: &str) -> std::result::Result<(), JsValue> {
    let window = web_sys::window().ok_or("No window")?;
    let document = window.document().ok_or("No document")?;

    let blob_parts = js_sys::Array::new();
    blob_parts.push(&JsValue::from_str(content));

    let blob_options = web_sys::BlobPropertyBag::new();
    blob_options.set_type(mime);

    let blob = Blob::new_with_str_sequence_and_options(&blob_parts, &blob_options)?;
    let url = Url::create_object_url_with_blob(&blob)?;

    let anchor: HtmlAnchorElement = document.create_element("a")?.dyn_into()?;
    anchor.set_href(&url);
    anchor.set_download(filename);
    anchor.click();

    Url::revoke_object_url(&url)?;
    Ok(())
}

fn js_error(err: JsValue) -> Error {
    Error::Storage(format!("{:?}", err))
}

/// Projects kept in `localStorage`, one JSON value per project under
/// `spanlink:project:<id>` and appended records under
/// `spanlink:records:<id>`
#[derive(Debug, Default)]
pub struct LocalStorageStore;

impl LocalStorageStore {
    fn storage() -> Result<Storage> {
        let window = web_sys::window().ok_or_else(|| Error::Storage("no window".to_string()))?;
        window
            .local_storage()
            .map_err(js_error)?
            .ok_or_else(|| Error::Storage("localStorage unavailable".to_string()))
    }

    fn project_key(project_id: &str) -> String {
        format!("spanlink:project:{project_id}")
    }

    fn records_key(project_id: &str) -> String {
        format!("spanlink:records:{project_id}")
    }
}

impl ProjectStore for LocalStorageStore {
    fn load_documents(&mut self, project_id: &str) -> Result<LoadedProject> {
        let raw = Self::storage()?
            .get_item(&Self::project_key(project_id))
            .map_err(js_error)?
            .ok_or_else(|| Error::ProjectNotFound(project_id.to_string()))?;
        let mut project: LoadedProject = serde_json::from_str(&raw)?;
        for doc in &mut project.documents {
            sanitize_document(doc);
        }
        Ok(project)
    }

    fn save_documents(
        &mut self,
        project_id: &str,
        config: &ProjectConfig,
        documents: &[Document],
    ) -> Result<Vec<i64>> {
        let mut documents = documents.to_vec();
        let ids = assign_record_ids(&mut documents);
        let project = LoadedProject {
            config: config.clone(),
            documents,
        };
        Self::storage()?
            .set_item(&Self::project_key(project_id), &serde_json::to_string(&project)?)
            .map_err(js_error)?;
        Ok(ids)
    }

    fn save_one_record(&mut self, project_id: &str, document: &Document) -> Result<()> {
        let storage = Self::storage()?;
        let key = Self::records_key(project_id);
        let mut records = storage.get_item(&key).map_err(js_error)?.unwrap_or_default();
        records.push_str(&serde_json::to_string(document)?);
        records.push('\n');
        storage.set_item(&key, &records).map_err(js_error)
    }
}
