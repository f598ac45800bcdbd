use actix_web::web;

mod health;
mod status;
mod timeline;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health_route)
        .service(status::status_route)
        .service(timeline::timeline_route);
}
