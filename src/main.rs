use fp_index::{AnyIndexer, IndexerConfig, ProbeSeq, RescalingIndexer, ShiftIndexer, SlotIndexer};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("Fingerprint Slot Indexer Demo");
    println!("=============================");

    let fingerprints = [
        1u64,
        0x2545_F491_4F6C_DD1D,
        0x3FFF_FFFF_FFFF_FFFF,
        9223371952792813846,
        u64::MAX >> 1,
    ];

    let rescaling = RescalingIndexer::new(99, 1)?;
    println!("\nRescaling indexer, 99 slots, 1 reserved bit:");
    for fp in fingerprints {
        println!("  {:#018x} -> slot {}", fp, rescaling.index(fp));
    }

    let shift = ShiftIndexer::new(1 << 29, 1)?;
    println!("\nShift indexer, 2^29 slots, 1 reserved bit:");
    for fp in fingerprints {
        println!("  {:#018x} -> slot {}", fp, shift.index(fp));
    }

    println!("\nProbe sequence of {:#018x} over 8 slots:", u64::MAX >> 1);
    let small = AnyIndexer::for_capacity(8, 1)?;
    let probes: Vec<_> = ProbeSeq::full(small, u64::MAX >> 1).collect();
    println!("  {:?}", probes);

    println!("\nCapacity limits:");
    match RescalingIndexer::new(1 << 31, 1) {
        Ok(_) => println!("  rescaling, 2^31 slots: ok"),
        Err(e) => println!("  rescaling, 2^31 slots: {}", e),
    }
    match ShiftIndexer::new(1 << 31, 1) {
        Ok(_) => println!("  shift, 2^31 slots: ok"),
        Err(e) => println!("  shift, 2^31 slots: {}", e),
    }

    let descriptor = IndexerConfig::new(96, 2).to_bytes()?;
    let rebuilt = IndexerConfig::from_bytes(&descriptor)?.build()?;
    println!(
        "\nDescriptor of {} bytes rebuilds a {} indexer over {} slots",
        descriptor.len(),
        if rebuilt.is_shift() { "shift" } else { "rescaling" },
        rebuilt.positions()
    );

    Ok(())
}
