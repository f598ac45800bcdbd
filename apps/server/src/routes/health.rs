use actix_web::{HttpResponse, Responder, get};

/// Liveness probe: an empty 200 once the store is open and the server is bound.
#[get("/health")]
pub async fn health_route() -> impl Responder {
    HttpResponse::Ok()
}

#[cfg(test)]
mod tests {
    use actix_web::{App, test};

    use super::*;

    #[actix_web::test]
    async fn health_is_ok_and_empty() {
        let app = test::init_service(App::new().service(health_route)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
        let body = test::read_body(resp).await;
        assert!(body.is_empty());
    }
}
