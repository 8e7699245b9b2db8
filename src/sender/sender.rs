use super::fdt::Fdt;
use super::objectdesc::{CarouselRepeatMode, ObjectDesc};
use super::observer::ObserverList;
use super::sendersession::SenderSession;
use super::toiallocator::Toi;
use super::Subscriber;
use crate::common::{alc, lct, oti, udpendpoint::UdpEndpoint, Profile};
use crate::tools::error::{FluteError, Result};
use crate::tools::uint128::Uint128;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;

/// Maximum number of bits used to encode a TOI.
///
/// LCT reserves the upper 16 bits of the 128-bit TOI field, so 112 bits is
/// the widest usable width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToiMaxLength {
    /// 16 bits
    ToiMax16,
    /// 32 bits
    ToiMax32,
    /// 48 bits
    ToiMax48,
    /// 64 bits
    ToiMax64,
    /// 80 bits
    ToiMax80,
    /// 112 bits
    ToiMax112,
}

impl ToiMaxLength {
    pub(crate) fn bits(&self) -> u32 {
        match self {
            ToiMaxLength::ToiMax16 => 16,
            ToiMaxLength::ToiMax32 => 32,
            ToiMaxLength::ToiMax48 => 48,
            ToiMaxLength::ToiMax64 => 64,
            ToiMaxLength::ToiMax80 => 80,
            ToiMaxLength::ToiMax112 => 112,
        }
    }
}

///
/// Configuration of a priority queue
///
#[derive(Debug)]
pub struct PriorityQueue {
    /// Max number of files that are multiplexed in this queue during the transmission.
    /// 0..1 : files are transferred one after the other.
    /// 2.. : multiple files might be transferred in parallel.
    pub multiplex_files: u32,
}

impl PriorityQueue {
    /// Highest priority level
    pub const HIGHEST: u32 = 0;
    /// High priority level
    pub const HIGH: u32 = 1;
    /// Medium priority level
    pub const MEDIUM: u32 = 2;
    /// Low priority level
    pub const LOW: u32 = 3;
    /// Very low priority level
    pub const VERYLOW: u32 = 4;

    /// Create a priority queue configuration.
    ///
    /// `multiplex_files` is the maximum number of files that are interleaved
    /// inside this queue during the transmission.
    pub fn new(multiplex_files: u32) -> Self {
        PriorityQueue { multiplex_files }
    }
}

/// Specifies how the File Delivery Table (FDT) is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdtPublishMode {
    /// The FDT is published only when `publish()` is explicitly called and
    /// describes all the objects inserted up to the time of publication.
    FullFdt,

    /// The FDT is automatically published before the transmission of each
    /// object and describes only the objects being transferred.
    ObjectsBeingTransferred,
}

///
/// Configuration of the `Sender`
///
#[derive(Debug)]
pub struct Config {
    /// Max duration of the FDT before expiration.
    pub fdt_duration: std::time::Duration,
    /// Controls how the FDT is repeatedly transferred in a carousel loop.
    pub fdt_carousel_mode: CarouselRepeatMode,
    /// First FDT ID.
    pub fdt_start_id: u32,
    /// Content encoding of the FDT.
    pub fdt_cenc: lct::Cenc,
    /// Insert the Sender Current Time inside ALC/LCT packets containing the FDT.
    pub fdt_inband_sct: bool,
    /// FDT publish mode.
    pub fdt_publish_mode: FdtPublishMode,
    /// Set of priority queues for the file transmission.
    /// A lower key indicates a higher priority, files added to higher
    /// priority queues are transferred with higher precedence.
    pub priority_queues: BTreeMap<u32, PriorityQueue>,
    /// Max number of blocks that are interleaved during the transmission of a file.
    /// Interleaving spreads out packet losses over multiple blocks, improving
    /// the resilience to burst losses at the price of more memory.
    pub interleave_blocks: u8,
    /// FLUTE profile used during the transmission.
    pub profile: Profile,
    /// Max number of bits used to encode the TOI.
    pub toi_max_length: ToiMaxLength,
    /// Value of the first TOI of the FLUTE session, must be > 0.
    /// `None` initializes the first TOI to a random value.
    pub toi_initial_value: Option<Uint128>,
    /// List of groups added to the FDT-Instance.
    pub groups: Option<Vec<String>>,
}

impl Config {
    /// Insert a priority queue into the configuration.
    ///
    /// A lower `priority` value has a higher precedence.
    pub fn set_priority_queue(&mut self, priority: u32, config: PriorityQueue) {
        self.priority_queues.insert(priority, config);
    }

    /// Remove a priority queue from the configuration.
    pub fn remove_priority_queue(&mut self, priority: u32) {
        self.priority_queues.remove(&priority);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fdt_duration: std::time::Duration::from_secs(3600),
            fdt_carousel_mode: CarouselRepeatMode::DelayBetweenTransfers(
                std::time::Duration::from_secs(1),
            ),
            fdt_start_id: 1,
            fdt_cenc: lct::Cenc::Null,
            fdt_inband_sct: true,
            fdt_publish_mode: FdtPublishMode::FullFdt,
            priority_queues: BTreeMap::from([(0, PriorityQueue { multiplex_files: 3 })]),
            interleave_blocks: 4,
            profile: Profile::RFC6726,
            toi_max_length: ToiMaxLength::ToiMax112,
            toi_initial_value: Some(Uint128::from(1)),
            groups: None,
        }
    }
}

#[derive(Debug)]
struct SenderSessionList {
    index: usize,
    sessions: Vec<SenderSession>,
}

///
/// FLUTE `Sender` session.
/// Transforms objects (files) into a stream of ALC/LCT packets.
///
#[derive(Debug)]
pub struct Sender {
    fdt: Fdt,
    fdt_session: SenderSession,
    sessions: BTreeMap<u32, SenderSessionList>,
    observers: ObserverList,
    tsi: u64,
    endpoint: UdpEndpoint,
}

impl Sender {
    ///
    /// Creation of a FLUTE Sender
    ///
    pub fn new(endpoint: UdpEndpoint, tsi: u64, oti: &oti::Oti, config: &Config) -> Sender {
        let observers = ObserverList::new();

        let fdt = Fdt::new(
            tsi,
            config.fdt_start_id,
            oti,
            config.fdt_cenc,
            config.fdt_duration,
            config.fdt_carousel_mode,
            config.fdt_inband_sct,
            observers.clone(),
            config.toi_max_length,
            config.toi_initial_value,
            config.groups.clone(),
            config.fdt_publish_mode,
        );

        let fdt_session = SenderSession::new(
            0,
            tsi,
            config.interleave_blocks as usize,
            true,
            config.profile,
        );

        let mut sessions = BTreeMap::new();
        for (priority, priority_queue_config) in &config.priority_queues {
            let multiplex_files = match priority_queue_config.multiplex_files {
                0 => 1,
                n => n,
            };

            let new_sessions = (0..multiplex_files)
                .map(|_| {
                    SenderSession::new(
                        *priority,
                        tsi,
                        config.interleave_blocks as usize,
                        false,
                        config.profile,
                    )
                })
                .collect();
            sessions.insert(
                *priority,
                SenderSessionList {
                    index: 0,
                    sessions: new_sessions,
                },
            );
        }

        Sender {
            fdt,
            fdt_session,
            sessions,
            observers,
            tsi,
            endpoint,
        }
    }

    /// Add an observer of the transfer events
    pub fn subscribe(&mut self, subscriber: Arc<dyn Subscriber>) {
        self.observers.subscribe(subscriber);
    }

    /// Remove an observer
    pub fn unsubscribe(&mut self, subscriber: Arc<dyn Subscriber>) {
        self.observers.unsubscribe(subscriber);
    }

    /// Destination endpoint of the emitted packets
    pub fn get_udp_endpoint(&self) -> &UdpEndpoint {
        &self.endpoint
    }

    /// TSI of this sender
    pub fn get_tsi(&self) -> u64 {
        self.tsi
    }

    /// Add an object to the FDT.
    ///
    /// In `FullFdt` mode, call `publish()` after adding objects so the new
    /// FDT version is transferred.
    ///
    /// # Arguments
    ///
    /// * `priority` - Priority queue used to transfer the object.
    /// * `obj` - The object to be added to the FDT.
    ///
    /// # Returns
    ///
    /// The TOI assigned to the object.
    pub fn add_object(&mut self, priority: u32, obj: Box<ObjectDesc>) -> Result<Uint128> {
        if !self.sessions.contains_key(&priority) {
            return Err(FluteError::InvalidConfiguration(format!(
                "Priority queue {} does not exist",
                priority
            )));
        }

        self.fdt.add_object(priority, obj)
    }

    /// Trigger the transfer of an object broadcast in a carousel.
    ///
    /// The object must be listed in the FDT. If the object is already being
    /// transferred, no action is taken.
    ///
    /// # Arguments
    /// * `toi` - TOI of the object.
    /// * `timestamp` - Optional start time of the transfer. `None` starts the
    ///   transfer immediately.
    ///
    /// # Returns
    /// `false` when the object is not listed in the FDT.
    pub fn trigger_transfer_at(&mut self, toi: Uint128, timestamp: Option<SystemTime>) -> bool {
        self.fdt.trigger_transfer_at(toi, timestamp)
    }

    /// Check if an object is inside the FDT
    pub fn is_added(&self, toi: Uint128) -> bool {
        self.fdt.is_added(toi)
    }

    /// Remove an object from the FDT.
    ///
    /// Call `publish()` after to publish the modification. If the object has
    /// not been transferred at least once, an ongoing transfer is not
    /// cancelled.
    ///
    /// # Returns
    ///
    /// `true` when the object has been removed from the FDT.
    pub fn remove_object(&mut self, toi: Uint128) -> bool {
        self.fdt.remove_object(toi)
    }

    /// Number of times an object has been fully transferred, or `None` if
    /// the object is not in the FDT anymore.
    pub fn nb_transfers(&self, toi: Uint128) -> Option<u64> {
        self.fdt.nb_transfers(toi)
    }

    /// Number of objects in the FDT
    pub fn nb_objects(&self) -> usize {
        self.fdt.nb_objects()
    }

    /// List the objects currently described by the FDT
    pub fn get_objects_in_fdt(&self) -> std::collections::HashMap<Uint128, &ObjectDesc> {
        self.fdt.get_objects_in_fdt()
    }

    /// Publish the modifications of the FDT.
    ///
    /// An updated FDT-Instance is generated and transferred. Multiple
    /// modifications can be made before publishing the new version.
    /// Only required when `fdt_publish_mode` is `FullFdt`.
    pub fn publish(&mut self, now: SystemTime) -> Result<()> {
        self.fdt.publish(now)
    }

    /// Declare the FDT as complete, no new object can be added after this
    /// call. A call to `publish()` is required to transfer the modification.
    pub fn set_complete(&mut self) {
        self.fdt.set_complete();
    }

    /// Generate a close-session packet
    pub fn read_close_session(&mut self, _now: SystemTime) -> Vec<u8> {
        alc::new_alc_pkt_close_session(&Uint128::ZERO, self.tsi)
    }

    /// Reserve a TOI.
    ///
    /// The reservation must be either dropped or assigned to an object
    /// passed to `add_object()`.
    pub fn allocate_toi(&mut self) -> Box<Toi> {
        self.fdt.allocate_toi()
    }

    /// Render the current FDT to XML
    pub fn fdt_xml_data(&self, now: SystemTime) -> Result<Vec<u8>> {
        self.fdt.to_xml(now)
    }

    /// Read the next ALC/LCT packet.
    ///
    /// Returns `None` when there is nothing to transfer. The packet should
    /// be encapsulated into a UDP payload and sent to the endpoint of this
    /// sender.
    pub fn read(&mut self, now: SystemTime) -> Option<Vec<u8>> {
        if let Some(fdt_data) = self.fdt_session.run(&mut self.fdt, now) {
            return Some(fdt_data);
        }

        let fdt = &mut self.fdt;
        for session_list in self.sessions.values_mut() {
            let data = Self::read_priority_queue(fdt, session_list, now);
            if data.is_some() {
                return data;
            }
        }

        if let Some(fdt_data) = self.fdt_session.run(&mut self.fdt, now) {
            return Some(fdt_data);
        }

        None
    }

    fn read_priority_queue(
        fdt: &mut Fdt,
        sessions: &mut SenderSessionList,
        now: SystemTime,
    ) -> Option<Vec<u8>> {
        let session_index_orig = sessions.index;
        loop {
            let session = sessions.sessions.get_mut(sessions.index).unwrap();
            let data = session.run(fdt, now);

            sessions.index += 1;
            if sessions.index == sessions.sessions.len() {
                sessions.index = 0;
            }

            if data.is_some() {
                return data;
            }

            if sessions.index == session_index_orig {
                break;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::common::lct;
    use crate::common::oti;
    use crate::common::udpendpoint::UdpEndpoint;
    use crate::sender::objectdesc;

    fn create_obj(length: usize) -> Box<objectdesc::ObjectDesc> {
        objectdesc::ObjectDesc::create_from_buffer(
            vec![0u8; length],
            "text",
            &url::Url::parse("file:///hello").unwrap(),
            1,
            None,
            None,
            None,
            None,
            lct::Cenc::Null,
            true,
            None,
            true,
        )
        .unwrap()
    }

    fn endpoint() -> UdpEndpoint {
        UdpEndpoint::new(None, "224.0.0.1".to_owned(), 1234)
    }

    #[test]
    pub fn test_sender() {
        crate::tests::init();

        let oti: oti::Oti = Default::default();
        let mut sender = super::Sender::new(endpoint(), 1, &oti, &Default::default());

        let nb_bytes = oti.encoding_symbol_length as usize * 3;
        sender.add_object(0, create_obj(nb_bytes)).unwrap();
        sender.publish(std::time::SystemTime::now()).unwrap();

        let mut nb_pkt = 0;
        while sender.read(std::time::SystemTime::now()).is_some() {
            nb_pkt += 1;
        }
        // at least one FDT packet and the 3 source symbols
        assert!(nb_pkt >= 4);
    }

    #[test]
    pub fn test_sender_file_too_large() {
        crate::tests::init();
        let oti = oti::Oti::new_no_code(4, 2);
        let object = create_obj(oti.max_transfer_length() as usize + 1);
        let mut sender = super::Sender::new(endpoint(), 1, &oti, &Default::default());
        let res = sender.add_object(0, object);
        assert!(res.is_err());
    }

    #[test]
    pub fn test_sender_unknown_priority_queue() {
        crate::tests::init();
        let mut sender = super::Sender::new(endpoint(), 1, &Default::default(), &Default::default());
        let res = sender.add_object(42, create_obj(1024));
        assert!(res.is_err());
    }

    #[test]
    pub fn test_sender_remove_object() {
        crate::tests::init();

        let object = create_obj(1024);
        let mut sender =
            super::Sender::new(endpoint(), 1, &Default::default(), &Default::default());
        assert_eq!(sender.nb_objects(), 0);

        let toi = sender.add_object(0, object).unwrap();
        assert_eq!(sender.nb_objects(), 1);
        assert!(sender.is_added(toi));

        assert!(sender.remove_object(toi));
        assert_eq!(sender.nb_objects(), 0);
        assert!(!sender.is_added(toi));
    }

    #[test]
    pub fn test_sender_complete() {
        crate::tests::init();

        let mut sender =
            super::Sender::new(endpoint(), 1, &Default::default(), &Default::default());

        let result = sender.add_object(0, create_obj(1024));
        assert!(result.is_ok());

        sender.set_complete();
        let result = sender.add_object(0, create_obj(1024));
        assert!(result.is_err());
    }

    #[test]
    pub fn test_sender_assign_toi_to_object() {
        crate::tests::init();
        let mut sender =
            super::Sender::new(endpoint(), 1, &Default::default(), &Default::default());
        let toi = sender.allocate_toi();
        let toi_value = toi.get();
        let mut obj = create_obj(1024);
        obj.set_toi(toi);
        let toi_result = sender.add_object(0, obj).unwrap();
        assert_eq!(toi_value, toi_result);
    }
}
