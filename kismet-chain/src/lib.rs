// SPDX-License-Identifier: Apache-2.0

pub mod chain;
pub mod packet;
pub mod worker;

pub use chain::{Handler, HandlerId, PacketChain, Stage, STAGES};
pub use packet::{CaptureTime, ComponentId, ComponentRegistry, Packet};
pub use worker::{input_queue, ChainWorker};
