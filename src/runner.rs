//! Session Event Loop
//!
//! Single-consumer driver for a [`StreamingSession`]. Platform glue pushes
//! [`SessionEvent`]s from wherever they originate (GATT callbacks, the
//! L2CAP socket, the audio capture task) into one channel; [`run`] pulls
//! them out in arrival order and feeds the state machine. Observers that
//! must not touch session state (UIs, supervisors) watch the snapshot
//! signal instead.

use crate::codec::G722Encoder;
use crate::session::StreamingSession;
use crate::transport::{SessionEvent, Transport};
use crate::{SessionSnapshot, SessionState};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Receiver;
use embassy_sync::signal::Signal;

/// Drive a session to completion, returning its terminal state
///
/// Calls [`StreamingSession::begin`] and then processes events until the
/// session reaches `Closed` or `Failed`. A fresh [`SessionSnapshot`] is
/// published after `begin` and after every state change.
pub async fn run<T, C, M, const N: usize>(
    session: &mut StreamingSession<T, C>,
    events: Receiver<'_, M, SessionEvent, N>,
    snapshots: &Signal<M, SessionSnapshot>,
) -> SessionState
where
    T: Transport,
    C: G722Encoder,
    M: RawMutex,
{
    if let Err(kind) = session.begin().await {
        defmt::error!("[RUNNER] Session did not start: {}", kind);
    }
    snapshots.signal(session.snapshot());

    while !session.state().is_terminal() {
        let event = events.receive().await;
        let before = session.state();
        let after = session.handle_event(event).await;
        if after != before {
            snapshots.signal(session.snapshot());
        }
    }

    let state = session.state();
    defmt::info!("[RUNNER] Session ended: {}", state);
    state
}
