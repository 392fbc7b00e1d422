use actix_files::{self as fs, NamedFile};
use actix_web::{web, Result};
use std::path::Path;

use crate::config::WebSettings;

/// HTTP handler for the spectator page
pub async fn index(settings: web::Data<WebSettings>) -> Result<NamedFile> {
    Ok(NamedFile::open(settings.static_dir.join("index.html"))?)
}

/// Configure the HTTP routes
pub fn configure_routes(cfg: &mut web::ServiceConfig, static_dir: &Path) {
    cfg.service(web::resource("/ws").route(web::get().to(crate::websocket::ws_index)))
        .service(web::resource("/").route(web::get().to(index)))
        .service(fs::Files::new("/static", static_dir));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ConsoleBuffer;
    use crate::models::SpectatorHub;
    use actix_web::{test, App};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[actix_rt::test]
    async fn serves_index_and_static_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>spectator</html>").unwrap();
        std::fs::write(dir.path().join("board.css"), "body {}").unwrap();
        let settings = WebSettings {
            static_dir: dir.path().to_path_buf(),
            ..WebSettings::default()
        };
        let static_dir = settings.static_dir.clone();
        let hub = web::Data::new(SpectatorHub::new(Arc::new(ConsoleBuffer::new())));

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(settings))
                .app_data(hub)
                .configure(|cfg| configure_routes(cfg, &static_dir)),
        )
        .await;

        let body = test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(body, "<html>spectator</html>");

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/static/board.css").to_request(),
        )
        .await;
        assert!(resp.status().is_success());
    }
}
