use actix_web::{web, App, HttpServer};

/// Starts an in-process mock of an upstream API on an ephemeral port and
/// returns its base URL. The server lives until the test runtime stops.
pub async fn spawn_upstream<F>(configure: F) -> String
where
    F: Fn(&mut web::ServiceConfig) + Send + Clone + 'static,
{
    let server = HttpServer::new(move || App::new().configure(configure.clone()))
        .workers(1)
        .disable_signals()
        .bind(("127.0.0.1", 0))
        .expect("bind mock upstream");
    let addr = server.addrs()[0];

    actix_rt::spawn(server.run());

    format!("http://{}", addr)
}

/// Base URL of a local port with nothing listening on it.
pub fn closed_port_base() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("reserve local port");
    let addr = listener.local_addr().expect("local port address");
    drop(listener);

    format!("http://{}", addr)
}
