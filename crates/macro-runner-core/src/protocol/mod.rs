mod codec;
mod launch_args;
mod packet;

pub use {
    codec::{Incoming, MAX_FRAME_LEN, PacketReader, PacketWriter, decode, encode},
    launch_args::{LAUNCH_ARG_DELIMITER, LaunchArgs},
    packet::Packet,
};
