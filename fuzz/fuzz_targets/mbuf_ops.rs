#![no_main]

use libfuzzer_sys::fuzz_target;
use mbufpool::{MbufConfig, MbufPool, MbufQueue};

fuzz_target!(|data: Vec<u8>| {
    let mut pool = MbufPool::new(MbufConfig::new(256).unwrap().with_max_free(4)).unwrap();
    let mut queue = MbufQueue::new();
    let mut mbuf = pool.take().unwrap();
    let mut model: Vec<u8> = Vec::new();

    // Input is consumed in pairs: operation selector, then argument.
    for op in data.chunks(2) {
        let arg = op.get(1).copied().unwrap_or(0) as usize;
        match op[0] % 6 {
            0 => {
                let n = arg.min(mbuf.writable_size());
                let bytes: Vec<u8> = (0..n).map(|i| (i + arg) as u8).collect();
                mbuf.copy(&bytes);
                model.extend_from_slice(&bytes);
            }
            1 => {
                let n = arg.min(mbuf.readable_size());
                mbuf.advance_read(n);
                model = model[n..].to_vec();
            }
            2 => mbuf.shift_left(),
            3 => mbuf.shift_right(),
            4 => {
                // Split and park the tail in the queue.
                let cut = mbuf.rpos() + arg.min(mbuf.readable_size());
                let tail = pool.split(&mut mbuf, cut).unwrap();
                let kept = cut - mbuf.rpos();
                assert_eq!(tail.readable(), &model[kept..]);
                model.truncate(kept);
                queue.insert(tail);
            }
            _ => {
                queue.drain_into(&mut pool);
            }
        }

        // Verify: cursors ordered, content matches the model, guard intact
        assert!(mbuf.rpos() <= mbuf.wpos());
        assert!(mbuf.wpos() <= mbuf.capacity());
        assert_eq!(mbuf.readable(), &model[..]);
        assert!(mbuf.is_intact());
        assert!(pool.free_count() <= 4);
    }

    queue.drain_into(&mut pool);
    pool.put(mbuf);
    assert_eq!(pool.outstanding(), 0);
});
