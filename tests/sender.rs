use flutecast::core::{alc, fdtinstance::FdtInstance, lct, oti, FecDecoder, RsGalois8Decoder};
use flutecast::core::{UdpEndpoint, Uint128};
use flutecast::sender;
use std::time::{Duration, SystemTime};

pub fn init() {
    env_logger::builder().is_test(true).try_init().ok();
}

fn endpoint() -> UdpEndpoint {
    UdpEndpoint::new(None, "224.0.0.1".to_owned(), 5000)
}

fn create_sender(oti: &oti::Oti, config: Option<sender::Config>) -> sender::Sender {
    sender::Sender::new(endpoint(), 1, oti, &config.unwrap_or_default())
}

fn create_object(
    buffer: Vec<u8>,
    max_transfer_count: u32,
    carousel_mode: Option<sender::CarouselRepeatMode>,
) -> Box<sender::ObjectDesc> {
    sender::ObjectDesc::create_from_buffer(
        buffer,
        "application/octet-stream",
        &url::Url::parse("file:///hello").unwrap(),
        max_transfer_count,
        carousel_mode,
        None,
        None,
        None,
        sender::Cenc::Null,
        true,
        None,
        true,
    )
    .unwrap()
}

/// Drain every packet the sender can emit at a fixed instant.
fn read_all(sender: &mut sender::Sender, now: SystemTime) -> Vec<Vec<u8>> {
    let mut pkts = Vec::new();
    while let Some(pkt) = sender.read(now) {
        pkts.push(pkt);
    }
    pkts
}

fn is_fdt_pkt(pkt: &[u8]) -> bool {
    let alc_pkt = alc::parse_alc_pkt(pkt).unwrap();
    alc_pkt.lct.toi == lct::TOI_FDT
}

#[test]
fn test_empty_file_close() {
    init();
    let now = SystemTime::now();
    let oti: oti::Oti = Default::default();
    let mut sender = create_sender(&oti, None);

    sender.add_object(0, create_object(Vec::new(), 1, None)).unwrap();
    sender.publish(now).unwrap();

    let pkts = read_all(&mut sender, now);
    let nb_fdt = pkts.iter().filter(|pkt| is_fdt_pkt(pkt)).count();
    let object_pkts: Vec<_> = pkts.iter().filter(|pkt| !is_fdt_pkt(pkt)).collect();

    assert!(nb_fdt >= 1);
    assert_eq!(object_pkts.len(), 1);

    let alc_pkt = alc::parse_alc_pkt(object_pkts[0]).unwrap();
    assert!(alc_pkt.lct.close_object);
    assert!(alc_pkt.data[alc_pkt.data_payload_offset..].is_empty());
}

#[test]
fn test_nocode_three_symbols() {
    init();
    let now = SystemTime::now();
    let oti = oti::Oti::new_no_code(1024, 64);
    let mut sender = create_sender(&oti, None);

    let input: Vec<u8> = (0..3072u32).map(|v| v as u8).collect();
    sender.add_object(0, create_object(input.clone(), 1, None)).unwrap();
    sender.publish(now).unwrap();

    let pkts = read_all(&mut sender, now);
    let object_pkts: Vec<_> = pkts.iter().filter(|pkt| !is_fdt_pkt(pkt)).collect();
    assert_eq!(object_pkts.len(), 3);

    let mut output: Vec<u8> = Vec::new();
    for (index, pkt) in object_pkts.iter().enumerate() {
        let alc_pkt = alc::parse_alc_pkt(pkt).unwrap();
        let payload_id = alc::parse_payload_id(&alc_pkt, &oti).unwrap();
        assert_eq!(payload_id.sbn, 0);
        assert_eq!(payload_id.esi, index as u32);
        output.extend(&alc_pkt.data[alc_pkt.data_payload_offset..]);
    }
    assert_eq!(output, input);
}

#[test]
fn test_rs28_recovery() {
    init();
    let now = SystemTime::now();
    let oti = oti::Oti::new_reed_solomon_gf28(32, 4, 2).unwrap();
    let mut sender = create_sender(&oti, None);

    let input: Vec<u8> = (0..128u32).map(|v| (v * 7) as u8).collect();
    sender.add_object(0, create_object(input.clone(), 1, None)).unwrap();
    sender.publish(now).unwrap();

    let pkts = read_all(&mut sender, now);
    let object_pkts: Vec<_> = pkts.iter().filter(|pkt| !is_fdt_pkt(pkt)).collect();
    assert_eq!(object_pkts.len(), 6);

    // any 4 of the 6 symbols rebuild the source block
    for (skip_a, skip_b) in [(0usize, 1usize), (4, 5), (0, 5), (2, 3)] {
        let mut decoder = RsGalois8Decoder::new(4, 2, 32).unwrap();
        for (index, pkt) in object_pkts.iter().enumerate() {
            if index == skip_a || index == skip_b {
                continue;
            }
            let alc_pkt = alc::parse_alc_pkt(pkt).unwrap();
            let payload_id = alc::parse_payload_id(&alc_pkt, &oti).unwrap();
            assert_eq!(payload_id.sbn, 0);
            decoder.push_symbol(&alc_pkt.data[alc_pkt.data_payload_offset..], payload_id.esi);
        }
        assert!(decoder.can_decode());
        assert!(decoder.decode());
        assert_eq!(decoder.source_block().unwrap(), input.as_slice());
    }
}

#[test]
fn test_add_after_complete() {
    init();
    let mut sender = create_sender(&Default::default(), None);
    sender.add_object(0, create_object(vec![0; 1024], 1, None)).unwrap();
    sender.set_complete();

    let res = sender.add_object(0, create_object(vec![0; 1024], 1, None));
    assert!(matches!(
        res,
        Err(flutecast::error::FluteError::FdtComplete)
    ));
}

#[test]
fn test_remove_object() {
    init();
    let now = SystemTime::now();
    let mut sender = create_sender(&Default::default(), None);
    let toi = sender
        .add_object(0, create_object(vec![0; 1024], 1, None))
        .unwrap();
    assert_eq!(sender.nb_objects(), 1);

    assert!(sender.remove_object(toi));
    assert_eq!(sender.nb_objects(), 0);
    sender.publish(now).unwrap();

    // at most one close-object packet remains for that TOI
    let pkts = read_all(&mut sender, now);
    let toi_pkts: Vec<_> = pkts
        .iter()
        .filter(|pkt| {
            let alc_pkt = alc::parse_alc_pkt(pkt).unwrap();
            alc_pkt.lct.toi == toi
        })
        .collect();
    assert!(toi_pkts.len() <= 1);
    for pkt in toi_pkts {
        let alc_pkt = alc::parse_alc_pkt(pkt).unwrap();
        assert!(alc_pkt.lct.close_object);
    }
}

#[test]
fn test_carousel_delay() {
    init();
    let now = SystemTime::now();
    let delay = Duration::from_millis(500);
    let mut sender = create_sender(&Default::default(), None);

    let toi = sender
        .add_object(
            0,
            create_object(
                vec![0; 1024],
                1,
                Some(sender::CarouselRepeatMode::DelayBetweenTransfers(delay)),
            ),
        )
        .unwrap();
    sender.publish(now).unwrap();

    // first pass
    let pkts = read_all(&mut sender, now);
    assert!(pkts.iter().any(|pkt| !is_fdt_pkt(pkt)));
    assert_eq!(sender.nb_transfers(toi), Some(1));

    // carousel interval not elapsed
    let pkts = read_all(&mut sender, now + Duration::from_millis(400));
    assert!(pkts.iter().all(|pkt| is_fdt_pkt(pkt)));

    // next pass is allowed after the delay
    let pkts = read_all(&mut sender, now + Duration::from_millis(600));
    assert!(pkts.iter().any(|pkt| !is_fdt_pkt(pkt)));
    assert_eq!(sender.nb_transfers(toi), Some(2));
}

#[test]
fn test_priority_ordering() {
    init();
    let now = SystemTime::now();
    let oti = oti::Oti::new_no_code(1400, 64);

    let mut config: sender::Config = Default::default();
    config.set_priority_queue(sender::PriorityQueue::HIGHEST, sender::PriorityQueue::new(1));
    config.set_priority_queue(sender::PriorityQueue::LOW, sender::PriorityQueue::new(1));

    let mut sender = create_sender(&oti, Some(config));
    let low_toi = sender
        .add_object(
            sender::PriorityQueue::LOW,
            create_object(vec![1; 10000], 1, None),
        )
        .unwrap();
    let high_toi = sender
        .add_object(
            sender::PriorityQueue::HIGHEST,
            create_object(vec![2; 10000], 1, None),
        )
        .unwrap();
    sender.publish(now).unwrap();

    let pkts = read_all(&mut sender, now);
    let tois: Vec<Uint128> = pkts
        .iter()
        .map(|pkt| alc::parse_alc_pkt(pkt).unwrap().lct.toi)
        .filter(|toi| *toi != lct::TOI_FDT)
        .collect();

    let last_high = tois.iter().rposition(|toi| *toi == high_toi).unwrap();
    let first_low = tois.iter().position(|toi| *toi == low_toi).unwrap();
    assert!(
        last_high < first_low,
        "high priority packets must all be emitted before the low priority ones"
    );
}

#[test]
fn test_fdt_pkt_roundtrip() {
    init();
    let now = SystemTime::now();
    let fdt_duration = Duration::from_secs(3600);
    let mut sender = create_sender(&Default::default(), None);
    let toi = sender
        .add_object(0, create_object(vec![0; 2048], 1, None))
        .unwrap();
    sender.publish(now).unwrap();

    let pkts = read_all(&mut sender, now);
    let fdt_pkt = pkts.iter().find(|pkt| is_fdt_pkt(pkt)).unwrap();

    let alc_pkt = alc::parse_alc_pkt(fdt_pkt).unwrap();
    let fdt_info = alc_pkt.fdt_info.as_ref().unwrap();
    assert_eq!(fdt_info.version, 2);
    assert_eq!(fdt_info.fdt_instance_id, 1);

    // FDT packets always carry the FTI of the FDT object
    assert!(alc_pkt.oti.is_some());

    // the last encoding symbol is zero-padded, truncate to the transfer length
    let payload = &alc_pkt.data[alc_pkt.data_payload_offset..];
    let transfer_length = alc_pkt.transfer_length.unwrap() as usize;
    let instance = FdtInstance::parse(&payload[..transfer_length.min(payload.len())]).unwrap();
    let files = instance.file.as_ref().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].toi, toi.to_string());
    assert_eq!(files[0].transfer_length, Some(2048));

    let expires: u64 = instance.expires.parse().unwrap();
    let ntp_now = flutecast::core::system_time_to_ntp(now).unwrap() >> 32;
    let diff = expires as i64 - (ntp_now + fdt_duration.as_secs()) as i64;
    assert!(diff.abs() <= 1, "Expires is off by {}s", diff);
}

#[test]
fn test_close_session_pkt() {
    init();
    let mut sender = create_sender(&Default::default(), None);
    let pkt = sender.read_close_session(SystemTime::now());

    let alc_pkt = alc::parse_alc_pkt(&pkt).unwrap();
    assert!(alc_pkt.lct.close_session);
    assert_eq!(alc_pkt.lct.toi, lct::TOI_FDT);
    assert_eq!(alc_pkt.lct.tsi, 1);
}

#[test]
fn test_toi_allocation() {
    init();
    let mut sender = create_sender(&Default::default(), None);
    let a = sender.allocate_toi();
    let b = sender.allocate_toi();
    assert!(!a.get().is_zero());
    assert!(!b.get().is_zero());
    assert_ne!(a.get(), b.get());
}

#[test]
fn test_sender_current_time_on_fdt() {
    init();
    let now = SystemTime::now();
    let mut sender = create_sender(&Default::default(), None);
    sender.add_object(0, create_object(vec![0; 16], 1, None)).unwrap();
    sender.publish(now).unwrap();

    let pkts = read_all(&mut sender, now);
    let fdt_pkt = pkts.iter().find(|pkt| is_fdt_pkt(pkt)).unwrap();
    let alc_pkt = alc::parse_alc_pkt(fdt_pkt).unwrap();
    let sct = alc::get_sender_current_time(&alc_pkt).unwrap().unwrap();
    let diff = match sct.duration_since(now) {
        Ok(d) => d,
        Err(e) => e.duration(),
    };
    assert!(diff < Duration::from_micros(1));
}
