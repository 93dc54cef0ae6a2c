//! The feedback protocol that builds the [`FeedbackMap`] m2n routing table
//! (§4.3).

use crate::mesh::BoundingBox;
use crate::transport::Transport;
use std::collections::HashMap;
use std::io;

/// `sender-rank -> set of receiver-ranks` that need data from it. Built by
/// the provided-side master from each received-side rank's list of needed
/// senders, and broadcast back to the provided-side group.
pub type FeedbackMap = HashMap<usize, Vec<usize>>;

/// Which provided-side sender ranks a receiving rank needs data from: those
/// whose box overlaps the receiver's own box once inflated by
/// `safety_factor` (the same geometric test used for vertex filtering).
pub fn needed_senders<const DIM: usize>(
    receiver_box: &BoundingBox<DIM>,
    sender_boxes: &[BoundingBox<DIM>],
    safety_factor: f64,
) -> Vec<usize> {
    let inflated_receiver = receiver_box.inflated(safety_factor);
    sender_boxes
        .iter()
        .enumerate()
        .filter(|(_, sender_box)| inflated_receiver.intersects_inflated(sender_box, 0.0))
        .map(|(rank, _)| rank)
        .collect()
}

/// Inverts `receiver_rank -> needed sender ranks` into `sender_rank ->
/// requesting receiver ranks`, the shape the provided side's master needs to
/// route m2n sends (§4.3).
pub fn invert(per_receiver: &HashMap<usize, Vec<usize>>) -> FeedbackMap {
    let mut map: FeedbackMap = HashMap::new();
    for (&receiver_rank, senders) in per_receiver {
        for &sender_rank in senders {
            map.entry(sender_rank).or_insert_with(Vec::new).push(receiver_rank);
        }
    }
    for receivers in map.values_mut() {
        receivers.sort_unstable();
    }
    map
}

/// Sent master-to-master, received-side to provided-side: for each of the
/// received side's own ranks (in rank order), the list of provided-side
/// sender ranks it needs. The provided-side master inverts this with
/// [`invert`] before broadcasting the result to its own ranks.
pub fn send_needed_senders<T: Transport>(transport: &mut T, per_receiver_rank: &[Vec<usize>]) -> io::Result<()> {
    transport.send_int(per_receiver_rank.len() as i32)?;
    for senders in per_receiver_rank {
        let ints: Vec<i32> = senders.iter().map(|&s| s as i32).collect();
        transport.send_ints(&ints)?;
    }
    Ok(())
}

pub fn receive_needed_senders<T: Transport>(transport: &mut T) -> io::Result<HashMap<usize, Vec<usize>>> {
    let num_receiver_ranks = transport.receive_int()? as usize;
    let mut per_receiver = HashMap::with_capacity(num_receiver_ranks);
    for receiver_rank in 0..num_receiver_ranks {
        let senders: Vec<usize> = transport.receive_ints()?.into_iter().map(|s| s as usize).collect();
        per_receiver.insert(receiver_rank, senders);
    }
    Ok(per_receiver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num_vec::Vector;

    #[test]
    fn needed_senders_round_trip_over_a_transport() {
        use crate::transport::ChannelTransport;
        let (mut a, mut b) = ChannelTransport::pair();
        let per_receiver = vec![vec![0usize, 2], vec![1usize]];
        send_needed_senders(&mut a, &per_receiver).unwrap();
        let received = receive_needed_senders(&mut b).unwrap();
        assert_eq!(received[&0], vec![0, 2]);
        assert_eq!(received[&1], vec![1]);
    }

    #[test]
    fn invert_groups_receivers_by_sender() {
        let mut per_receiver = HashMap::new();
        per_receiver.insert(0usize, vec![0usize, 1]);
        per_receiver.insert(1usize, vec![1]);

        let map = invert(&per_receiver);
        assert_eq!(map[&0], vec![0]);
        assert_eq!(map[&1], vec![0, 1]);
    }

    #[test]
    fn needed_senders_filters_by_overlap() {
        let mut receiver = BoundingBox::<2>::empty();
        receiver.expand_by_point(&Vector::from([0.0, 0.0]));
        receiver.expand_by_point(&Vector::from([1.0, 1.0]));

        let mut near = BoundingBox::<2>::empty();
        near.expand_by_point(&Vector::from([0.5, 0.5]));
        near.expand_by_point(&Vector::from([1.5, 1.5]));

        let mut far = BoundingBox::<2>::empty();
        far.expand_by_point(&Vector::from([10.0, 10.0]));
        far.expand_by_point(&Vector::from([11.0, 11.0]));

        let result = needed_senders(&receiver, &[near, far], 0.0);
        assert_eq!(result, vec![0]);
    }
}
