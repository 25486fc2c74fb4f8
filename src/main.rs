use devicefarm_runner::{app, clean_logger};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let res = app::run().await;
    clean_logger();
    match res {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(1);
        }
    }
}
