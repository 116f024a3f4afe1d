//! Minimal terminal client.
//!
//! A transport-only presenter: typed lines go to the server verbatim,
//! server lines are printed, and control tokens are mapped to UI effects
//! through the one canonical parser in `protocol::token`.

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crosstalk::board::{Board, Tile};
use crosstalk::protocol::{ControlToken, LineCodec};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:7777".to_string());

    let stream = TcpStream::connect(&addr).await?;
    println!("Connected to {}. Login with !login <user> <pass> or !register.", addr);
    let (mut sink, mut lines) = Framed::new(stream, LineCodec::new()).split();

    tokio::spawn(async move {
        let mut board = Board::new();
        while let Some(frame) = lines.next().await {
            match frame {
                Ok(line) => present(&line, &mut board),
                Err(e) => {
                    eprintln!("connection error: {}", e);
                    break;
                }
            }
        }
        println!("Disconnected.");
        std::process::exit(0);
    });

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = input.next_line().await? {
        sink.send(line).await?;
    }
    Ok(())
}

/// Prints one server line, turning control tokens into UI effects.
fn present(line: &str, board: &mut Board) {
    let Some(token) = ControlToken::parse(line) else {
        println!("{}", line);
        return;
    };
    match token {
        ControlToken::Player1 => {
            println!("You joined as player 1 and play X. Send !startgame when ready.");
        }
        ControlToken::Player2 => {
            println!("You joined as player 2 and play O. Waiting for player 1 to start.");
        }
        ControlToken::SetTile { index, tile } => {
            board.place(index, tile);
            print_board(board);
        }
        ControlToken::YourTurn => println!("Your turn! Place a mark with !move <0-8>."),
        ControlToken::WaitTurn => println!("Waiting for your opponent..."),
        ControlToken::ResetBoard => {
            board.reset();
            println!("The board was cleared.");
        }
        ControlToken::LeaveGame => println!("You are back in the chat room."),
    }
}

/// Renders the board with cell numbers in the blanks.
fn print_board(board: &Board) {
    for row in 0..3 {
        let cells: Vec<String> = (0..3)
            .map(|col| {
                let index = row * 3 + col;
                match board.get(index) {
                    Some(Tile::Blank) | None => index.to_string(),
                    Some(tile) => tile.mark().to_string(),
                }
            })
            .collect();
        println!(" {}", cells.join(" | "));
        if row < 2 {
            println!("---+---+---");
        }
    }
}
