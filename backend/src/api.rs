use std::sync::MutexGuard;

use actix_cors::Cors;
use actix_web::{
    error::ErrorInternalServerError,
    get,
    http::header,
    put,
    web::{self, Data},
    App, HttpResponse, HttpServer, Responder,
};
use log::info;
use serde_json::Value;

use crate::config::Config;
use crate::dashboard::{Dashboard, SharedDashboard};
use crate::feed::MemoryFeed;

fn lock(dashboard: &SharedDashboard) -> actix_web::Result<MutexGuard<'_, Dashboard>> {
    dashboard
        .lock()
        .map_err(|_| ErrorInternalServerError("dashboard state unavailable"))
}

#[get("/")]
async fn hello() -> impl Responder {
    HttpResponse::Ok().body("agrinex backend")
}

#[get("/api/sensors")]
async fn api_sensors(dashboard: web::Data<SharedDashboard>) -> actix_web::Result<impl Responder> {
    let dashboard = lock(&dashboard)?;
    Ok(web::Json(dashboard.response()))
}

#[get("/api/sensors/{sensor_id}")]
async fn api_sensor_detail(
    path: web::Path<String>,
    dashboard: web::Data<SharedDashboard>,
) -> actix_web::Result<HttpResponse> {
    let sensor_id = path.into_inner();
    let dashboard = lock(&dashboard)?;

    Ok(match dashboard.detail(&sensor_id) {
        Ok(Some(detail)) => HttpResponse::Ok().json(detail),
        Ok(None) => HttpResponse::NotFound().body(format!("unknown sensor: {sensor_id}")),
        Err(_) => HttpResponse::ServiceUnavailable().json(dashboard.response()),
    })
}

#[get("/api/readings")]
async fn api_readings(dashboard: web::Data<SharedDashboard>) -> actix_web::Result<HttpResponse> {
    let dashboard = lock(&dashboard)?;

    Ok(match dashboard.sensors() {
        Ok(sensors) => HttpResponse::Ok().json(sensors),
        Err(_) => HttpResponse::ServiceUnavailable().json(dashboard.response()),
    })
}

#[put("/api/sensor_readings")]
async fn api_put_sensor_readings(
    snapshot: web::Json<Value>,
    feed: web::Data<MemoryFeed>,
    dashboard: web::Data<SharedDashboard>,
) -> actix_web::Result<impl Responder> {
    feed.publish(snapshot.into_inner());

    let dashboard = lock(&dashboard)?;
    Ok(web::Json(dashboard.response()))
}

/// Routes of the API. The push endpoint is only mounted for an in-memory feed.
pub fn configure(cfg: &mut web::ServiceConfig, feed: Option<MemoryFeed>) {
    cfg.service(hello)
        .service(api_sensors)
        .service(api_sensor_detail)
        .service(api_readings);

    if let Some(feed) = feed {
        cfg.app_data(Data::new(feed)).service(api_put_sensor_readings);
    }
}

pub async fn new_http_server(
    config: &Config,
    dashboard: SharedDashboard,
    feed: Option<MemoryFeed>,
) -> std::io::Result<()> {
    let origin = config.frontend_origin.clone();
    info!("HTTP server on http://{}", config.http_bind);

    HttpServer::new(move || {
        let feed = feed.clone();
        App::new()
            .app_data(Data::new(dashboard.clone()))
            .configure(|cfg| configure(cfg, feed))
            .wrap(
                Cors::default()
                    .allowed_origin(&origin) // frontend
                    .allowed_methods(vec!["GET", "PUT"])
                    .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT])
                    .allowed_header(header::CONTENT_TYPE)
                    .max_age(3600),
            )
    })
    .bind(&config.http_bind)?
    .run()
    .await
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::feed::FeedEvent;
    use actix_web::{http::StatusCode, test};
    use common::req::{DashboardResponse, FeedState, SensorDetail};
    use common::Normalized;
    use serde_json::json;

    fn snapshot() -> Value {
        json!({
            "sensor_2": {
                "x": {"moisture_percent": 9.0, "raw_adc": 3950, "timestamp": "2024-04-02T06:00:00Z"}
            },
            "sensor_1": {
                "b": {"moisture_percent": 62.0, "raw_adc": 1200, "timestamp": "2024-04-02T06:00:00Z"},
                "a": {"moisture_percent": 64.0, "raw_adc": 1150, "timestamp": "2024-04-02T05:00:00Z"}
            }
        })
    }

    #[actix_web::test]
    async fn test_sensors_loading() {
        let dashboard = Dashboard::shared();
        let app = test::init_service(
            App::new()
                .app_data(Data::new(dashboard.clone()))
                .configure(|cfg| configure(cfg, None)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/sensors").to_request();
        let resp: DashboardResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp, DashboardResponse::loading());

        let req = test::TestRequest::get().uri("/api/readings").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn test_sensors_and_detail() {
        let dashboard = Dashboard::shared();
        dashboard
            .lock()
            .unwrap()
            .apply(FeedEvent::Snapshot(snapshot()));

        let app = test::init_service(
            App::new()
                .app_data(Data::new(dashboard.clone()))
                .configure(|cfg| configure(cfg, None)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/sensors").to_request();
        let resp: DashboardResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.state, FeedState::Ready);
        let ids = resp.sensors.iter().map(|c| c.sensor_id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["sensor_1", "sensor_2"]);
        assert_eq!(resp.sensors[0].moisture_percent, 62.0);
        assert_eq!(resp.sensors[1].status_label, "Critically Dry");

        let req = test::TestRequest::get().uri("/api/sensors/sensor_1").to_request();
        let detail: SensorDetail = test::call_and_read_body_json(&app, req).await;
        assert_eq!(detail.name, "Sensor 1");
        assert_eq!(detail.trend.moisture, vec![64.0, 62.0]);
        assert_eq!(detail.log[0].raw_adc(), 1200);

        let req = test::TestRequest::get().uri("/api/sensors/sensor_9").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/api/readings").to_request();
        let readings: Normalized = test::call_and_read_body_json(&app, req).await;
        assert_eq!(readings["sensor_1"].history().len(), 2);
        assert_eq!(readings["sensor_1"].latest().raw_adc(), 1200);
    }

    #[actix_web::test]
    async fn test_push_snapshot() {
        let dashboard = Dashboard::shared();
        let feed = MemoryFeed::new();
        let _sub = Dashboard::attach(&dashboard, &feed);

        let app = test::init_service(
            App::new()
                .app_data(Data::new(dashboard.clone()))
                .configure(|cfg| configure(cfg, Some(feed.clone()))),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/api/sensor_readings")
            .set_json(snapshot())
            .to_request();
        let resp: DashboardResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.sensors.len(), 2);

        let req = test::TestRequest::put()
            .uri("/api/sensor_readings")
            .set_json(json!({"sensor_1": {"a": {"timestamp": "bad"}}}))
            .to_request();
        let resp: DashboardResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.state, FeedState::Error);
        assert!(resp.sensors.is_empty());

        let req = test::TestRequest::get().uri("/api/sensors/sensor_1").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn test_push_not_mounted_without_memory_feed() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(Dashboard::shared()))
                .configure(|cfg| configure(cfg, None)),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/api/sensor_readings")
            .set_json(json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
