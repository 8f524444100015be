use crate::input::{ClientAction, InputManager};
use crate::rendering;
use crate::BoxError;
use log::{debug, info, warn};
use shared::{Request, Response};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Why the client loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The user typed `quit` or closed stdin
    UserQuit,
    /// Our robot died or the server shut the game down
    GameOver,
    /// The server hung up
    Disconnected,
}

/// Connection to a robot world server.
///
/// Requests go out as one JSON object per line and every line read back is
/// a response or a notice. The user's terminal and the server are watched
/// together so notices show up while the user is still typing.
pub struct Client {
    reader: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    input: InputManager,
    /// Name sent with a launch that has not been answered yet
    awaiting_launch: Option<String>,
}

impl Client {
    pub async fn connect(address: &str) -> Result<Self, BoxError> {
        let stream = TcpStream::connect(address).await?;
        info!("Connected to {}", stream.peer_addr()?);
        let (read_half, writer) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(read_half).lines(),
            writer,
            input: InputManager::new(),
            awaiting_launch: None,
        })
    }

    /// Name of the robot this client controls, once launched
    pub fn robot(&self) -> Option<&str> {
        self.input.robot()
    }

    pub async fn send(&mut self, request: &Request) -> Result<(), BoxError> {
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        debug!("Sent {}", line.trim_end());

        if request.command.eq_ignore_ascii_case("launch") {
            self.awaiting_launch = Some(request.robot.clone());
        }
        Ok(())
    }

    /// Reads the next response, or `None` once the server hangs up.
    pub async fn receive(&mut self) -> Result<Option<Response>, BoxError> {
        let Some(line) = self.reader.next_line().await? else {
            return Ok(None);
        };
        let response: Response = serde_json::from_str(&line)?;
        self.track_launch(&response);
        Ok(Some(response))
    }

    fn track_launch(&mut self, response: &Response) {
        let Some(name) = self.awaiting_launch.take() else {
            return;
        };
        if response.is_ok() && response.message().contains("launched") {
            info!("Now controlling '{}'", name);
            self.input.set_robot(name);
        }
    }

    /// Runs the interactive session until the user quits or the game ends.
    pub async fn run(&mut self) -> Result<Exit, BoxError> {
        let mut stdin = BufReader::new(tokio::io::stdin()).lines();
        println!("Type 'launch <make> <name>' to start, 'help' for commands, 'quit' to leave.");

        loop {
            tokio::select! {
                line = stdin.next_line() => {
                    let Some(line) = line? else {
                        return Ok(Exit::UserQuit);
                    };
                    match self.input.parse(&line) {
                        Ok(ClientAction::Send(request)) => self.send(&request).await?,
                        Ok(ClientAction::Quit) => {
                            self.writer.shutdown().await?;
                            return Ok(Exit::UserQuit);
                        }
                        Ok(ClientAction::Nothing) => {}
                        Err(e) => println!("{}", e),
                    }
                }
                response = self.receive() => {
                    let response = match response {
                        Ok(Some(response)) => response,
                        Ok(None) => {
                            println!("Server closed the connection.");
                            return Ok(Exit::Disconnected);
                        }
                        Err(e) => {
                            warn!("Unreadable response: {}", e);
                            continue;
                        }
                    };
                    println!("{}", rendering::format_response(&response));
                    if rendering::is_fatal(&response) {
                        self.input.clear_robot();
                        return Ok(Exit::GameOver);
                    }
                }
            }
        }
    }
}
