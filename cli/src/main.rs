mod cli;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::SerialPortBuilderExt;

use hdlcontroller::{Config, Controller, Error};

use cli::Args;


#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let config = Config::default()
        .with_ack_timeout(Duration::from_millis(args.timeout))
        .with_max_attempts(args.attempts);

    // set up transport
    if let Some(address) = &args.connect {
        tracing::debug!("connecting to {address}");

        let stream = tokio::net::TcpStream::connect(address).await?;
        run(stream, config, &args).await
    } else {
        tracing::debug!("opening {} at {} baud", args.device, args.baudrate);

        let port = tokio_serial::new(&args.device, args.baudrate).open_native_async()?;
        run(port, config, &args).await
    }
}

async fn run<T>(transport: T, config: Config, args: &Args) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    let controller = Controller::new(transport, config);
    controller.start().await?;

    let result = tokio::select! {
        res = send_messages(&controller, args) => res,
        res = print_received(&controller) => res,
        sig = tokio::signal::ctrl_c() => {
            sig?;
            tracing::trace!("termination requested");
            Ok(())
        },
    };

    controller.stop().await?;

    tracing::trace!("controller terminated successfully");
    result
}

async fn send_messages<T>(controller: &Controller<T>, args: &Args) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    if args.listen {
        return std::future::pending().await;
    }

    let mut interval = tokio::time::interval(Duration::try_from_secs_f64(args.interval)?);
    let mut sent = 0;

    while args.count.is_none_or(|count| sent < count) {
        interval.tick().await;

        match controller.send(args.message.clone().into_bytes()).await {
            Ok(()) => println!("> {}", args.message),
            Err(e @ Error::DeliveryFailed { .. }) => eprintln!("[x] {e}"),
            Err(e) => return Err(e.into()),
        }

        sent += 1;
    }

    Ok(())
}

async fn print_received<T>(controller: &Controller<T>) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    loop {
        let data = controller.get_data().await;
        println!("< {}", String::from_utf8_lossy(&data));
    }
}
