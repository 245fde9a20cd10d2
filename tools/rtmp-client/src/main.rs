use log::{error, info};
use rcl_amf0::Amf0Value;
use rcl_rtmp::capabilities;
use rcl_rtmp::handshake::HandshakeMode;
use rcl_rtmp::sessions::{ClientSession, ClientSessionConfig, MediaPacketType, StreamMetadata};
use std::env;
use std::error::Error;
use std::io::Cursor;

const DEFAULT_PACKET_COUNT: usize = 100;

fn main() {
    env_logger::init();

    let mut args: Vec<String> = env::args().collect();
    args.drain(0..1); // remove the executable

    let result = match args.get(0).map(|x| x.as_str()) {
        Some("play") if args.len() >= 2 => {
            let count = match args.get(2) {
                Some(count) => count.parse().unwrap_or(DEFAULT_PACKET_COUNT),
                None => DEFAULT_PACKET_COUNT,
            };

            play(&args[1], count)
        }

        Some("handshake") if args.len() >= 2 => {
            let mode = match args.get(2).map(|x| x.as_str()) {
                Some("complex") => HandshakeMode::Complex,
                _ => HandshakeMode::Simple,
            };

            handshake(&args[1], mode)
        }

        Some("version") => {
            print_version();
            Ok(())
        }

        _ => {
            print_usage();
            Ok(())
        }
    };

    if let Err(error) = result {
        error!("{}", error);
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("No arguments provided.  One of the following must be provided");
    println!("Play a stream: play <rtmp url> [packet count]");
    println!("Test a handshake: handshake <rtmp url> [simple|complex]");
    println!("Show library version: version");
}

fn print_version() {
    println!(
        "rcl_rtmp {}.{}.{} (complex handshake: {}, ssl: {})",
        capabilities::version_major(),
        capabilities::version_minor(),
        capabilities::version_revision(),
        capabilities::complex_handshake_supported(),
        capabilities::ssl_enabled()
    );
}

fn handshake(url: &str, mode: HandshakeMode) -> Result<(), Box<dyn Error>> {
    let mut config = ClientSessionConfig::new();
    config.handshake_mode = mode;

    let mut session = ClientSession::connect_tcp(url, config)?;
    session.perform_handshake()?;
    println!("Handshaking Completed!");

    Ok(())
}

fn play(url: &str, count: usize) -> Result<(), Box<dyn Error>> {
    let mut session = ClientSession::connect_tcp(url, ClientSessionConfig::new())?;
    session.perform_handshake()?;
    session.connect_app()?;
    session.play_stream()?;

    info!("Playback started, reading {} packets", count);
    for _ in 0..count {
        let packet = session.read_packet()?;
        println!(
            "{} packet: timestamp={} size={}",
            packet.packet_type.as_str(),
            packet.timestamp,
            packet.data.len()
        );

        if packet.packet_type == MediaPacketType::Data {
            print_script_data(&packet.data);
        }
    }

    session.close()?;
    Ok(())
}

fn print_script_data(data: &[u8]) {
    let values = match rcl_amf0::deserialize(&mut Cursor::new(data)) {
        Ok(values) => values,
        Err(error) => {
            println!("    <unreadable script data: {}>", error);
            return;
        }
    };

    if let Some(metadata) = StreamMetadata::from_script_data(&values) {
        println!("    {:?}", metadata);
    }

    for value in values.iter().filter(|x| !matches!(x, Amf0Value::Utf8String(_))) {
        for line in value.to_human_readable().lines() {
            println!("    {}", line);
        }
    }
}
