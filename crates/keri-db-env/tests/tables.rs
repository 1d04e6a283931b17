//! Table view behavior, checked against every backend.

use keri_db_core::{on_key, sn_key, Ordinal};
use keri_db_env::{BackendKind, EnvConfig, EnvError, Environment, TableSpec};

const CATALOG: &[TableSpec] = &[
    TableSpec::single("vals"),
    TableSpec::dups("dups"),
    TableSpec::dups("iods"),
    TableSpec::dups("escrow"),
    TableSpec::single("log"),
];

const BACKENDS: [BackendKind; 2] = [BackendKind::Lmdb, BackendKind::Sqlite];

fn open(backend: BackendKind) -> Environment {
    Environment::open(
        "test",
        true,
        EnvConfig::default().with_backend(backend),
        CATALOG,
    )
    .unwrap()
}

fn each_backend(test: impl Fn(&Environment)) {
    for backend in BACKENDS {
        let mut env = open(backend);
        test(&env);
        env.close(true).unwrap();
    }
}

fn bytes(vals: &[&str]) -> Vec<Vec<u8>> {
    vals.iter().map(|v| v.as_bytes().to_vec()).collect()
}

const PRE_A: &str = "B8KY1sKmgyjAiUDdUBPNPyrSz_ad_Qf9yzhDNZlEKiMc";
const PRE_B: &str = "EH7Oq9oxCgYa-nnNLvwhp9sFZpALILlRYyB-6n4WDi7w";
const PRE_C: &str = "EpDA1n-WiBA0A8YOqnKrB-wWQYYC49i5zY_qrIZIicQg";

const DIG_A: &str = "ER73b7reENuBahMJsMTLbeyyNPsfTRzKRWtJ3ytmInvw";
const DIG_U: &str = "ER73b7reENuBahMJsMTLbeyyNPsfTRzKRWtJ3ytmInvw";
const DIG_V: &str = "EA4vCeJswIBJlO3RqE-wsE72Vt3wAceJ_LzqKvbDtBSY";
const DIG_W: &str = "EyAyl33W9ja_wLX85UrzRnL4KNzlsIKIA7CrD04nVX1w";
const DIG_X: &str = "EEnwxEm5Bg5s5aTLsgQCNpubIYzwlvMwZIzdOM0Z3u7o";
const DIG_Y: &str = "Enrq74_Q11S2vHx1gpK_46Ik5Q7Yy9K1zZ5BavqGDKnk";
const DIG_C: &str = "E-5RimdY_OWoreR-Z-Q5G81-I4tjASJCaP_MqkBbtM2w";

// ============================================================================
// Single values
// ============================================================================

#[test]
fn test_single_write_once() {
    each_backend(|env| {
        let vals = env.single("vals");
        let key = b"A.0";

        assert_eq!(vals.get(key).unwrap(), None);
        assert!(!vals.del(key).unwrap());

        assert!(vals.put(key, b"v1").unwrap());
        assert!(!vals.put(key, b"v2").unwrap());
        assert_eq!(vals.get(key).unwrap(), Some(b"v1".to_vec()));

        assert!(vals.set(key, b"v2").unwrap());
        assert_eq!(vals.get(key).unwrap(), Some(b"v2".to_vec()));

        assert!(vals.del(key).unwrap());
        assert_eq!(vals.get(key).unwrap(), None);

        // set on a fresh key reports that nothing was there
        assert!(!vals.set(key, b"v3").unwrap());
        assert_eq!(vals.get(key).unwrap(), Some(b"v3".to_vec()));
    });
}

#[test]
fn test_empty_value_is_not_absent() {
    each_backend(|env| {
        let vals = env.single("vals");
        assert!(vals.put(b"k", b"").unwrap());
        assert_eq!(vals.get(b"k").unwrap(), Some(Vec::new()));
    });
}

// ============================================================================
// Lexicographic duplicates
// ============================================================================

#[test]
fn test_dups_lexicographic() {
    each_backend(|env| {
        let dups = env.dups("dups");
        let key = b"A";

        assert!(dups.get(key).unwrap().is_empty());
        assert_eq!(dups.count(key).unwrap(), 0);

        assert!(dups.put(key, ["z", "m", "x", "a"]).unwrap());
        assert_eq!(dups.get(key).unwrap(), bytes(&["a", "m", "x", "z"]));
        assert_eq!(dups.count(key).unwrap(), 4);

        // nothing new
        assert!(!dups.put(key, ["a"]).unwrap());
        assert!(!dups.add(key, "a").unwrap());
        assert!(dups.put(key, ["a", "b"]).unwrap());
        assert_eq!(dups.count(key).unwrap(), 5);

        assert!(dups.del_val(key, "b").unwrap());
        assert!(!dups.del_val(key, "b").unwrap());

        let seen: Vec<Vec<u8>> = dups.iter(key).map(|v| v.unwrap()).collect();
        assert_eq!(seen, bytes(&["a", "m", "x", "z"]));

        assert!(dups.del(key).unwrap());
        assert!(!dups.del(key).unwrap());
        assert!(dups.get(key).unwrap().is_empty());
    });
}

#[test]
fn test_dups_delete_while_iterating() {
    each_backend(|env| {
        let dups = env.dups("dups");
        dups.put(b"A", ["z", "m", "x", "a"]).unwrap();
        dups.put(b"B", ["q"]).unwrap();

        let mut removed = Vec::new();
        for val in dups.iter(b"A") {
            let val = val.unwrap();
            assert!(dups.del_val(b"A", &val).unwrap());
            removed.push(val);
        }
        assert_eq!(removed, bytes(&["a", "m", "x", "z"]));
        assert_eq!(dups.count(b"A").unwrap(), 0);
        // neighbours untouched
        assert_eq!(dups.get(b"B").unwrap(), bytes(&["q"]));
    });
}

// ============================================================================
// Insertion-ordered duplicates
// ============================================================================

#[test]
fn test_io_dups_insertion_order() {
    each_backend(|env| {
        let iods = env.io_dups("iods");
        let key = b"A";

        assert!(iods.put(key, ["z", "m", "x", "a"]).unwrap());
        assert_eq!(iods.get(key).unwrap(), bytes(&["z", "m", "x", "a"]));
        assert_eq!(iods.last(key).unwrap(), Some(b"a".to_vec()));
        assert_eq!(iods.count(key).unwrap(), 4);

        // content already present under another ordinal
        assert!(!iods.add(key, "m").unwrap());
        assert!(!iods.put(key, ["z", "a"]).unwrap());
        assert_eq!(iods.count(key).unwrap(), 4);

        assert!(iods.del_val(key, "x").unwrap());
        assert!(iods.add(key, "w").unwrap());
        assert!(iods.del_val(key, "z").unwrap());
        assert!(iods.add(key, "e").unwrap());

        assert_eq!(iods.get(key).unwrap(), bytes(&["m", "a", "w", "e"]));
        assert_eq!(iods.last(key).unwrap(), Some(b"e".to_vec()));

        let seen: Vec<Vec<u8>> = iods.iter(key).map(|v| v.unwrap()).collect();
        assert_eq!(seen, bytes(&["m", "a", "w", "e"]));

        assert!(!iods.del_val(key, "z").unwrap());
        assert!(iods.del(key).unwrap());
        assert_eq!(iods.last(key).unwrap(), None);
        assert!(iods.get(key).unwrap().is_empty());
    });
}

#[test]
fn test_io_dups_reinsert_goes_last() {
    each_backend(|env| {
        let iods = env.io_dups("iods");
        iods.put(b"A", ["a", "b", "c"]).unwrap();
        assert!(iods.del_val(b"A", "a").unwrap());
        assert!(iods.add(b"A", "a").unwrap());
        assert_eq!(iods.get(b"A").unwrap(), bytes(&["b", "c", "a"]));
    });
}

fn pre_vals(env: &Environment, pre: &str) {
    let iods = env.io_dups("iods");
    iods.put(sn_key(pre, 0), ["gamma", "alpha"]).unwrap();
    iods.put(sn_key(pre, 1), ["beta"]).unwrap();
    iods.put(sn_key(pre, 3), ["delta", "epsilon"]).unwrap();
}

#[test]
fn test_pre_walks() {
    each_backend(|env| {
        pre_vals(env, PRE_A);
        // another prefix sorting after must not leak in
        pre_vals(env, PRE_C);
        let iods = env.io_dups("iods");

        let all: Vec<Vec<u8>> = iods.vals_all_pre_iter(PRE_A).map(|v| v.unwrap()).collect();
        assert_eq!(all, bytes(&["gamma", "alpha", "beta"]));

        let last: Vec<Vec<u8>> = iods.last_all_pre_iter(PRE_A).map(|v| v.unwrap()).collect();
        assert_eq!(last, bytes(&["alpha", "beta"]));

        let any: Vec<Vec<u8>> = iods.vals_any_pre_iter(PRE_A).map(|v| v.unwrap()).collect();
        assert_eq!(any, bytes(&["gamma", "alpha", "beta", "delta", "epsilon"]));

        assert_eq!(iods.vals_all_pre_iter(PRE_B).count(), 0);
        assert_eq!(iods.vals_any_pre_iter(PRE_B).count(), 0);
    });
}

// ============================================================================
// Escrow replay
// ============================================================================

fn escrow(env: &Environment) -> [(Vec<u8>, Vec<Vec<u8>>); 4] {
    let entries = [
        (sn_key("A", 1), bytes(&["z", "m", "x"])),
        (sn_key("A", 2), bytes(&["o", "r", "z"])),
        (sn_key("A", 4), bytes(&["h", "n"])),
        (sn_key("A", 7), bytes(&["k", "b"])),
    ];
    let edb = env.io_dups("escrow");
    for (key, vals) in &entries {
        assert!(edb.put(key, vals).unwrap());
    }
    entries
}

fn split(items: Vec<(Vec<u8>, Vec<u8>)>) -> (Vec<Vec<u8>>, Vec<Vec<u8>>) {
    items.into_iter().unzip()
}

#[test]
fn test_items_next() {
    each_backend(|env| {
        let [a, b, c, d] = escrow(env);
        let edb = env.io_dups("escrow");

        // empty start, skip or not, is the first key
        let (keys, vals) = split(edb.items_next(b"", true).unwrap());
        assert!(keys.iter().all(|k| *k == a.0));
        assert_eq!(vals, a.1);
        let (_, vals) = split(edb.items_next(b"", false).unwrap());
        assert_eq!(vals, a.1);

        let (keys, vals) = split(edb.items_next(&a.0, false).unwrap());
        assert_eq!(keys[0], a.0);
        assert_eq!(vals, a.1);

        let mut key = a.0.clone();
        for expected in [&b, &c, &d] {
            let (keys, vals) = split(edb.items_next(&key, true).unwrap());
            assert_eq!(keys[0], expected.0);
            assert_eq!(vals, expected.1);
            key = keys[0].clone();
        }
        assert!(edb.items_next(&key, true).unwrap().is_empty());

        // a key between entries resumes at the next one
        let (keys, _) = split(edb.items_next(sn_key("A", 3), false).unwrap());
        assert_eq!(keys[0], c.0);
    });
}

#[test]
fn test_items_next_iter_drains_escrow() {
    each_backend(|env| {
        let entries = escrow(env);
        let edb = env.io_dups("escrow");

        let mut key = Vec::new();
        let mut skip = false;
        for (expected_key, expected_vals) in &entries {
            let mut vals = Vec::new();
            for item in edb.items_next_iter(&key, skip) {
                let (ikey, val) = item.unwrap();
                assert_eq!(&ikey, expected_key);
                assert!(edb.del_val(&ikey, &val).unwrap());
                vals.push(val);
            }
            assert_eq!(&vals, expected_vals);
            key = expected_key.clone();
            skip = true;
        }
        assert_eq!(edb.items_next_iter(&key, true).count(), 0);
        assert_eq!(edb.items_next_iter(b"", false).count(), 0);
    });
}

#[test]
fn test_batches() {
    each_backend(|env| {
        let entries = escrow(env);
        let edb = env.io_dups("escrow");

        let batches: Vec<(Vec<u8>, Vec<Vec<u8>>)> =
            edb.batches(b"", false).map(|b| b.unwrap()).collect();
        assert_eq!(batches, entries.to_vec());

        let rest: Vec<Vec<u8>> = edb
            .batches(&entries[1].0, true)
            .map(|b| b.unwrap().0)
            .collect();
        assert_eq!(rest, vec![entries[2].0.clone(), entries[3].0.clone()]);

        // resuming at a present key without skip repeats its batch
        let again: Vec<(Vec<u8>, Vec<Vec<u8>>)> = edb
            .batches(&entries[1].0, false)
            .map(|b| b.unwrap())
            .collect();
        assert_eq!(again, entries[1..].to_vec());

        // a key between two present keys starts at the next one either way
        for skip in [false, true] {
            let from_gap: Vec<(Vec<u8>, Vec<Vec<u8>>)> = edb
                .batches(sn_key("A", 3), skip)
                .map(|b| b.unwrap())
                .collect();
            assert_eq!(from_gap, entries[2..].to_vec());
        }

        // past the last key there is nothing
        assert_eq!(edb.batches(sn_key("A", 8), false).count(), 0);
        assert_eq!(edb.batches(&entries[3].0, true).count(), 0);
        assert_eq!(edb.batches(sn_key("B", 0), false).count(), 0);
    });
}

// ============================================================================
// Ordinal log
// ============================================================================

fn fill_log(env: &Environment) {
    let log = env.ord_log("log");
    assert!(log.put(on_key(PRE_A, 0), DIG_A).unwrap());
    for (on, dig) in [DIG_U, DIG_V, DIG_W, DIG_X, DIG_Y].iter().enumerate() {
        assert_eq!(log.append(PRE_B, dig).unwrap(), on as Ordinal);
    }
    assert!(log.put(on_key(PRE_C, 0), DIG_C).unwrap());
}

#[test]
fn test_append_between_partitions() {
    each_backend(|env| {
        let log = env.ord_log("log");

        // append on an empty log, then delete, repeatedly lands on slot 0
        for _ in 0..3 {
            assert_eq!(log.append(PRE_B, DIG_U).unwrap(), 0);
            assert!(log.del(on_key(PRE_B, 0)).unwrap());
        }

        // neighbours on either side do not shift the ordinals
        assert!(log.put(on_key(PRE_A, 0), DIG_A).unwrap());
        assert_eq!(log.append(PRE_B, DIG_U).unwrap(), 0);
        assert!(log.put(on_key(PRE_C, 0), DIG_C).unwrap());
        assert_eq!(log.append(PRE_B, DIG_V).unwrap(), 1);
        assert_eq!(log.get(on_key(PRE_B, 1)).unwrap(), Some(DIG_V.as_bytes().to_vec()));

        assert_eq!(log.count_pre(PRE_B).unwrap(), 2);
        assert_eq!(log.count_pre(PRE_A).unwrap(), 1);
    });
}

#[test]
fn test_log_replay() {
    each_backend(|env| {
        fill_log(env);
        let log = env.ord_log("log");
        assert_eq!(log.count_pre(PRE_B).unwrap(), 5);

        let items: Vec<(Ordinal, Vec<u8>)> = log.items_pre(PRE_B, 0).map(|i| i.unwrap()).collect();
        let digs = [DIG_U, DIG_V, DIG_W, DIG_X, DIG_Y];
        assert_eq!(items.len(), 5);
        for (on, (got_on, dig)) in items.iter().enumerate() {
            assert_eq!(*got_on, on as Ordinal);
            assert_eq!(dig.as_slice(), digs[on].as_bytes());
        }

        let tail: Vec<(Ordinal, Vec<u8>)> = log.items_pre(PRE_B, 3).map(|i| i.unwrap()).collect();
        assert_eq!(
            tail,
            vec![(3, DIG_X.as_bytes().to_vec()), (4, DIG_Y.as_bytes().to_vec())]
        );
        assert_eq!(log.items_pre(PRE_B, 5).count(), 0);
    });
}

#[test]
fn test_log_replay_all() {
    each_backend(|env| {
        fill_log(env);
        let log = env.ord_log("log");

        let all: Vec<(Vec<u8>, Ordinal, Vec<u8>)> =
            log.items_all(b"", false).map(|i| i.unwrap()).collect();
        let expected: Vec<(Vec<u8>, Ordinal, Vec<u8>)> = [
            (PRE_A, 0, DIG_A),
            (PRE_B, 0, DIG_U),
            (PRE_B, 1, DIG_V),
            (PRE_B, 2, DIG_W),
            (PRE_B, 3, DIG_X),
            (PRE_B, 4, DIG_Y),
            (PRE_C, 0, DIG_C),
        ]
        .iter()
        .map(|(pre, on, dig)| (pre.as_bytes().to_vec(), *on, dig.as_bytes().to_vec()))
        .collect();
        assert_eq!(all, expected);

        let resumed: Vec<_> = log
            .items_all(on_key(PRE_B, 2), false)
            .map(|i| i.unwrap())
            .collect();
        assert_eq!(resumed, expected[3..].to_vec());

        let skipped: Vec<_> = log
            .items_all(on_key(PRE_B, 2), true)
            .map(|i| i.unwrap())
            .collect();
        assert_eq!(skipped, expected[4..].to_vec());

        assert_eq!(log.items_all(on_key(PRE_C, 1), false).count(), 0);
    });
}

#[test]
fn test_append_after_interior_gap() {
    each_backend(|env| {
        fill_log(env);
        let log = env.ord_log("log");

        // an out-of-band interior delete never causes a collision
        assert!(log.del(on_key(PRE_B, 2)).unwrap());
        assert_eq!(log.count_pre(PRE_B).unwrap(), 4);
        assert_eq!(log.append(PRE_B, "late").unwrap(), 5);
        assert_eq!(log.get(on_key(PRE_B, 4)).unwrap(), Some(DIG_Y.as_bytes().to_vec()));
    });
}

// ============================================================================
// Idempotence and errors
// ============================================================================

fn snapshot(env: &Environment) -> Vec<(Vec<u8>, Vec<Vec<u8>>)> {
    env.io_dups("iods")
        .batches(b"", false)
        .map(|b| b.unwrap())
        .collect()
}

#[test]
fn test_repeated_sequence_is_idempotent() {
    each_backend(|env| {
        let iods = env.io_dups("iods");
        let run = || {
            iods.put(b"A", ["z", "m", "x", "a"]).unwrap();
            iods.del_val(b"A", "x").unwrap();
            iods.add(b"B", "q").unwrap();
            iods.del(b"C").unwrap();
        };

        run();
        let first = snapshot(env);
        run();
        assert_eq!(snapshot(env), first);
        assert_eq!(
            first,
            vec![
                (b"A".to_vec(), bytes(&["z", "m", "a"])),
                (b"B".to_vec(), bytes(&["q"])),
            ]
        );
    });
}

#[test]
fn test_wrong_layout_and_unknown_table() {
    each_backend(|env| {
        assert!(matches!(
            env.dups("vals").get(b"k"),
            Err(EnvError::LayoutMismatch { .. })
        ));
        assert!(matches!(
            env.io_dups("nope").add(b"k", b"v"),
            Err(EnvError::UnknownTable(_))
        ));
        let err = env.dups("missing").iter(b"k").next().unwrap();
        assert!(matches!(err, Err(EnvError::UnknownTable(_))));
    });
}
