use protocol::{Decoded, Frame};
use space::Position;

use super::command::{CommandChain, CommandEvent};
use super::{game_registry, ChatMessage, GameMessage, MessageKind, MovementMessage};
use crate::model::Player;
use crate::update::block::ChatBlock;

/// Longest path a client may submit in one movement message.
pub const MAXIMUM_PATH_LENGTH: usize = 100;

/// What a handler may touch while a player's inbox is dispatched.
pub struct HandlerContext<'a> {
    pub player: &'a mut Player,
    pub commands: &'a CommandChain,
}

pub type Handler = fn(&mut HandlerContext<'_>, &GameMessage);

/// Routes decoded game messages to their handler by [`MessageKind`].
pub struct MessageDispatcher {
    handlers: [Option<Handler>; MessageKind::COUNT],
}

impl MessageDispatcher {
    pub fn empty() -> Self {
        Self {
            handlers: [None; MessageKind::COUNT],
        }
    }

    pub fn new() -> Self {
        let mut dispatcher = Self::empty();
        dispatcher.register(MessageKind::Movement, handle_movement);
        dispatcher.register(MessageKind::Chat, handle_chat);
        dispatcher.register(MessageKind::Command, handle_command);
        dispatcher
    }

    pub fn register(&mut self, kind: MessageKind, handler: Handler) {
        self.handlers[kind as usize] = Some(handler);
    }

    pub fn dispatch(&self, context: &mut HandlerContext<'_>, message: &GameMessage) {
        match self.handlers[message.kind() as usize] {
            Some(handler) => handler(context, message),
            None => tracing::trace!(kind = ?message.kind(), player = %context.player.username(), "no handler for message"),
        }
    }

    /// Decodes and dispatches one inbound frame. A frame that fails to decode closes the session.
    pub fn dispatch_frame(&self, context: &mut HandlerContext<'_>, frame: &Frame) {
        match game_registry().decode(frame) {
            Ok(Decoded::Message(message)) => self.dispatch(context, &message),
            Ok(Decoded::Unhandled(opcode)) => tracing::trace!(opcode, "ignored message"),
            Err(e) => {
                tracing::warn!(player = %context.player.username(), opcode = frame.opcode(), error = %e, "malformed message");
                context.player.disconnect();
            }
        }
    }
}

impl Default for MessageDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn handle_movement(context: &mut HandlerContext<'_>, message: &GameMessage) {
    let GameMessage::Movement(MovementMessage { path, run }) = message else {
        return;
    };
    let player = &mut *context.player;
    if path.len() > MAXIMUM_PATH_LENGTH {
        tracing::warn!(player = %player.username(), steps = path.len(), "discarded oversized path");
        return;
    }

    let current = player.position();
    let running = *run || player.is_running();
    let queue = player.movement_mut();
    let mut points = path.iter().map(|p| Position::new(p.x, p.y, current.height));
    let Some(first) = points.next() else {
        return;
    };
    queue.add_first_step(first, current);
    for point in points {
        queue.add_step(point, current);
    }
    queue.set_running(running);
}

fn handle_chat(context: &mut HandlerContext<'_>, message: &GameMessage) {
    let GameMessage::Chat(ChatMessage {
        effects,
        colour,
        compressed,
        ..
    }) = message
    else {
        return;
    };
    let player = &mut *context.player;
    let block = ChatBlock::new(*effects, *colour, player.privilege(), compressed.clone());
    player.flag_chat(block);
}

fn handle_command(context: &mut HandlerContext<'_>, message: &GameMessage) {
    let GameMessage::Command { text } = message else {
        return;
    };
    let event = CommandEvent::parse(text);
    if !context.commands.notify(context.player, &event) {
        tracing::trace!(command = %event.name, player = %context.player.username(), "unhandled command");
    }
}
