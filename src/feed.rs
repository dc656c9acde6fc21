use log::{debug, warn};
use presence_rs::messages::Command;
use tokio::io::{AsyncBufRead, AsyncBufReadExt as _};
use tokio::sync::mpsc;

/// Forwards one command per line until EOF, `quit`, or the receiver goes
/// away. Lines that do not parse are skipped.
pub async fn read_commands<R>(reader: R, tx: mpsc::Sender<Command>) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(err) => {
                warn!("Ignoring {:?}: {}", line, err);
                continue;
            }
        };

        let quit = command == Command::Quit;
        if tx.send(command).await.is_err() {
            debug!("Command receiver closed");
            break;
        }
        if quit {
            break;
        }
    }

    debug!("Activity feed finished");
    Ok(())
}
