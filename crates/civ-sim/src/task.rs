//! Virtual radio actor task
//!
//! Owns a [`VirtualRadio`] and serves it over an async byte stream. The task
//! uses a select! loop to:
//! - Read CI-V frames from the stream and write back the radio's replies
//! - Apply front-panel changes and shutdown requests from a channel

use std::io;

use civ_protocol::FrameBuffer;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::VirtualRadio;

/// Commands that can be sent to a virtual radio actor
#[derive(Debug, Clone)]
pub enum VirtualRadioCommand {
    /// Turn the tuning knob on the current VFO
    SetFrequency(u64),
    /// Change the raw S-meter reading
    SetSMeter(u8),
    /// Answer every future frame carrying this command byte with NG
    Reject(u8),
    /// Shutdown the virtual radio actor
    Shutdown,
}

/// Run the virtual radio actor task
///
/// Runs until the stream reaches end-of-file or a shutdown is requested,
/// then hands the radio back so callers can inspect its final state. A
/// closed command channel does not stop the task.
pub async fn run_virtual_radio_task<S>(
    mut stream: S,
    mut radio: VirtualRadio,
    mut cmd_rx: mpsc::Receiver<VirtualRadioCommand>,
) -> io::Result<VirtualRadio>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut frames = FrameBuffer::new();
    let mut buf = [0u8; 1024];
    let mut commands_open = true;

    info!(
        "Starting virtual radio task for {} ({} at 0x{:02X})",
        radio.id(),
        radio.model(),
        radio.address()
    );

    loop {
        tokio::select! {
            result = stream.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        debug!("Virtual radio stream closed for {}", radio.id());
                        break;
                    }
                    Ok(n) => {
                        debug!("Virtual radio {} received {} bytes: {:02X?}", radio.id(), n, &buf[..n]);
                        frames.push_bytes(&buf[..n]);

                        while let Some(frame) = frames.next_frame() {
                            for reply in radio.handle_frame(&frame) {
                                stream.write_all(&reply.to_bytes()).await?;
                            }
                        }
                        stream.flush().await?;
                    }
                    Err(e) => {
                        warn!("Virtual radio {} stream error: {}", radio.id(), e);
                        return Err(e);
                    }
                }
            }

            cmd = cmd_rx.recv(), if commands_open => {
                match cmd {
                    Some(VirtualRadioCommand::SetFrequency(hz)) => radio.set_frequency(hz),
                    Some(VirtualRadioCommand::SetSMeter(raw)) => radio.set_s_meter_raw(raw),
                    Some(VirtualRadioCommand::Reject(command)) => radio.reject_command(command),
                    Some(VirtualRadioCommand::Shutdown) => {
                        info!("Shutdown requested for virtual radio {}", radio.id());
                        break;
                    }
                    None => {
                        debug!("Command channel closed for virtual radio {}", radio.id());
                        commands_open = false;
                    }
                }
            }
        }
    }

    info!("Virtual radio task ended for {}", radio.id());
    Ok(radio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use civ_protocol::{Command, Frame, RadioModel, CONTROLLER_ADDR};

    async fn read_frame<S: AsyncRead + Unpin>(stream: &mut S, frames: &mut FrameBuffer) -> Frame {
        let mut buf = [0u8; 64];
        loop {
            if let Some(frame) = frames.next_frame() {
                return frame;
            }
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "stream closed");
            frames.push_bytes(&buf[..n]);
        }
    }

    #[tokio::test]
    async fn serves_frames_and_returns_radio_on_eof() {
        let (mut near, far) = tokio::io::duplex(256);
        let (_cmd_tx, cmd_rx) = mpsc::channel(4);
        let radio = VirtualRadio::new("task", RadioModel::Ic7300);
        let handle = tokio::spawn(run_virtual_radio_task(far, radio, cmd_rx));

        let set = Frame::new(0x94, CONTROLLER_ADDR, &Command::new(0x0F, [0x01]));
        near.write_all(&set.to_bytes()).await.unwrap();

        let mut frames = FrameBuffer::new();
        assert!(read_frame(&mut near, &mut frames).await.is_ack());

        drop(near);
        let radio = handle.await.unwrap().unwrap();
        assert!(radio.split());
        assert_eq!(radio.frames_handled(), 1);
    }

    #[tokio::test]
    async fn echoing_model_writes_echo_then_reply() {
        let (mut near, far) = tokio::io::duplex(256);
        let (_cmd_tx, cmd_rx) = mpsc::channel(4);
        let radio = VirtualRadio::new("task", RadioModel::Ic746);
        let handle = tokio::spawn(run_virtual_radio_task(far, radio, cmd_rx));

        let read = Frame::new(0x56, CONTROLLER_ADDR, &Command::read(0x03, None));
        near.write_all(&read.to_bytes()).await.unwrap();

        let mut frames = FrameBuffer::new();
        assert_eq!(read_frame(&mut near, &mut frames).await, read);
        let reply = read_frame(&mut near, &mut frames).await;
        assert_eq!(reply.command, 0x03);
        assert_eq!(reply.destination, CONTROLLER_ADDR);

        drop(near);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn channel_commands_reach_radio() {
        let (mut near, far) = tokio::io::duplex(256);
        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        let radio = VirtualRadio::new("task", RadioModel::Ic7300);
        let handle = tokio::spawn(run_virtual_radio_task(far, radio, cmd_rx));

        cmd_tx.send(VirtualRadioCommand::SetFrequency(7_074_000)).await.unwrap();
        cmd_tx.send(VirtualRadioCommand::Reject(0x0F)).await.unwrap();

        let set = Frame::new(0x94, CONTROLLER_ADDR, &Command::new(0x0F, [0x01]));
        near.write_all(&set.to_bytes()).await.unwrap();
        let mut frames = FrameBuffer::new();
        assert!(read_frame(&mut near, &mut frames).await.is_nak());

        cmd_tx.send(VirtualRadioCommand::Shutdown).await.unwrap();
        let radio = handle.await.unwrap().unwrap();
        assert_eq!(radio.frequency_hz(), 7_074_000);
        assert!(!radio.split());
    }

    #[tokio::test]
    async fn dropped_command_channel_keeps_serving() {
        let (mut near, far) = tokio::io::duplex(256);
        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        drop(cmd_tx);
        let radio = VirtualRadio::new("task", RadioModel::Ic7300);
        let handle = tokio::spawn(run_virtual_radio_task(far, radio, cmd_rx));

        let set = Frame::new(0x94, CONTROLLER_ADDR, &Command::new(0x0F, [0x00]));
        near.write_all(&set.to_bytes()).await.unwrap();
        let mut frames = FrameBuffer::new();
        assert!(read_frame(&mut near, &mut frames).await.is_ack());

        drop(near);
        assert!(handle.await.unwrap().is_ok());
    }
}
