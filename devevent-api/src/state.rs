use devevent_domain::media::MediaHost;
use devevent_domain::repository::Datastore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Datastore>,
    pub media: Arc<dyn MediaHost>,
    pub media_folder: String,
    pub max_upload_bytes: usize,
}
