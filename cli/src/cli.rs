use clap::Parser;


/// Exchange HDLC data frames over a serial line or TCP connection
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Serial device to use
    #[arg(short, long, default_value = "/dev/ttyACM0")]
    pub device: String,

    /// Serial baud rate
    #[arg(short, long, default_value_t = 9600)]
    pub baudrate: u32,

    /// Connect to a TCP endpoint (host:port) instead of a serial device
    #[arg(short, long, conflicts_with_all = ["device", "baudrate"])]
    pub connect: Option<String>,

    /// Message to send
    #[arg(short, long, default_value = "test")]
    pub message: String,

    /// Interval between two data frames, in seconds
    #[arg(short, long, default_value_t = 1.0)]
    pub interval: f64,

    /// Acknowledgment timeout, in milliseconds
    #[arg(short, long, default_value_t = 1000)]
    pub timeout: u64,

    /// Transmissions of a data frame before giving up on it
    #[arg(short, long, default_value_t = 3)]
    pub attempts: u32,

    /// Stop after sending this many messages
    #[arg(short = 'n', long)]
    pub count: Option<u64>,

    /// Only print received data, do not send anything
    #[arg(short, long)]
    pub listen: bool,
}
