use deferred_ngin::data_structures::{
    gbuffer::{
        AttachmentDesc, CHANNEL_COUNT, GBufferChannel, check_completeness,
        required_bytes_per_sample,
    },
    texture::Texture,
};

const SIZE: [u32; 2] = [1600, 900];

fn color(slot: usize) -> Option<AttachmentDesc> {
    Some(AttachmentDesc {
        slot,
        size: SIZE,
        format: Texture::GBUFFER_FORMAT,
    })
}

fn depth() -> Option<AttachmentDesc> {
    Some(AttachmentDesc {
        slot: 0,
        size: SIZE,
        format: Texture::DEPTH_FORMAT,
    })
}

fn colors() -> Vec<Option<AttachmentDesc>> {
    (0..CHANNEL_COUNT).map(color).collect()
}

fn check(colors: &[Option<AttachmentDesc>], depth: Option<AttachmentDesc>) -> Result<(), String> {
    check_completeness(colors, depth, required_bytes_per_sample())
}

#[test]
fn full_set_is_complete() {
    assert_eq!(check(&colors(), depth()), Ok(()));
}

#[test]
fn every_slot_must_be_filled() {
    for slot in 0..CHANNEL_COUNT {
        let mut set = colors();
        set[slot] = None;
        let err = check(&set, depth()).unwrap_err();
        assert!(err.contains(&format!("slot {slot}")), "{err}");
    }
    assert!(check(&colors()[..4], depth()).is_err());
}

#[test]
fn attachments_must_sit_in_their_own_slot() {
    let mut set = colors();
    set.swap(1, 2);
    assert!(check(&set, depth()).is_err());
}

#[test]
fn depth_is_required_and_must_be_a_depth_format() {
    assert!(check(&colors(), None).is_err());
    let mut bad_depth = depth();
    if let Some(d) = bad_depth.as_mut() {
        d.format = Texture::GBUFFER_FORMAT;
    }
    assert!(check(&colors(), bad_depth).is_err());
}

#[test]
fn depth_formats_are_not_colour_targets() {
    let mut set = colors();
    if let Some(c) = set[GBufferChannel::Normal.slot()].as_mut() {
        c.format = Texture::DEPTH_FORMAT;
    }
    assert!(check(&set, depth()).is_err());
}

#[test]
fn all_attachments_share_one_size() {
    let mut set = colors();
    if let Some(c) = set[3].as_mut() {
        c.size = [800, 450];
    }
    assert!(check(&set, depth()).is_err());

    let zero = Some(AttachmentDesc {
        slot: 0,
        size: [0, 900],
        format: Texture::DEPTH_FORMAT,
    });
    assert!(check(&colors(), zero).is_err());
}

#[test]
fn slots_match_the_channel_order() {
    let slots: Vec<usize> = GBufferChannel::ALL.iter().map(|c| c.slot()).collect();
    assert_eq!(slots, [0, 1, 2, 3, 4]);
    assert_eq!(GBufferChannel::default(), GBufferChannel::Color);
    assert_eq!(GBufferChannel::Normal.next(), GBufferChannel::Position);
}
