use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use zubi_client::speech;
use zubi_client::{ApiClient, Conversation, TerminalSurface, ToolDispatcher};
use zubi_shared::TurnResponse;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let Some(image_arg) = std::env::args().nth(1) else {
        print_usage();
        return Ok(());
    };

    let server_url =
        std::env::var("ZUBI_SERVER").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let api = ApiClient::new(server_url.clone());

    // Local files are uploaded first; URLs and data payloads pass through.
    let image = if image_arg.starts_with("http") || image_arg.starts_with("data:") {
        image_arg
    } else {
        let uploaded = match api.upload(Path::new(&image_arg)).await {
            Ok(uploaded) => uploaded,
            Err(e) => {
                eprintln!("Could not upload {image_arg}: {e}");
                eprintln!("Is the Zubi server running at {server_url}?");
                return Err(e);
            }
        };
        println!("Uploaded {image_arg} as {}\n", uploaded.url);
        uploaded.url
    };

    let surface = Arc::new(TerminalSurface::new());
    let dispatcher = ToolDispatcher::new(surface.clone());
    let conversation = Conversation::new(api);

    println!("🧒 Speak with Zubi! Type what the child says; 'quit' to stop.\n");

    if let Some(opening) = conversation.begin(image).await {
        speak(&opening, &dispatcher);
    }

    let mut session = speech::spawn_line_reader();
    while !conversation.is_ended() {
        print!("Child: ");
        io::stdout().flush()?;

        let Some(text) = session.final_result().await else {
            break;
        };
        if text.eq_ignore_ascii_case("quit") {
            break;
        }

        println!();
        if let Some(turn) = conversation.send_message(text).await {
            speak(&turn, &dispatcher);
        }
    }
    session.stop();

    println!(
        "\n⭐ Stars earned: {}  (conversation lasted {}s)",
        surface.star_count(),
        conversation.elapsed_seconds()
    );
    Ok(())
}

fn speak(turn: &TurnResponse, dispatcher: &ToolDispatcher) {
    println!("Buddy: {}\n", turn.say);
    dispatcher.execute(turn.tool.as_ref());
}

fn print_usage() {
    println!("Buddy - talk with Zubi about a picture");
    println!("\nUsage:");
    println!("  buddy photo.jpg               Upload a photo and start talking");
    println!("  buddy https://…/photo.png     Talk about a remote image");
    println!("  buddy data:image/png;base64,… Talk about an embedded image");
    println!("\nEnvironment:");
    println!("  ZUBI_SERVER   Server URL (default http://localhost:3000)");
}
