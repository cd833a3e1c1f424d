//! Descriptor engine integration tests
//!
//! End-to-end checks against fixed script vectors (BIP143 examples,
//! bitcoind's `createmultisig`, Bitcoin Core's descriptor tests) plus the
//! cross-cutting properties: round-tripping, checksum detection, wildcard
//! argument ordering and composition rejection.

use bitcoin::hex::FromHex;
use bitcoin_descriptor::{AddressParams, AddressType, Descriptor, Error, ScriptType};

fn script_hex(desc: &Descriptor, args: &[&str]) -> String {
    format!("{:x}", desc.locking_script_with_args(args).unwrap())
}

#[test]
fn wpkh_bip143_vector() {
    let desc = Descriptor::parse(
        "wpkh(025476c2e83188368da1ff3e292e7acafcdb3566bb0ad253f62fc70f07aeee6357)",
    )
    .unwrap();
    assert_eq!(
        script_hex(&desc, &[]),
        "00141d0f172a0ecb48aee1be1f2687d2963ae33f71a1"
    );
    assert_eq!(desc.need_argument_num(), 0);
    let reference = desc.reference(&[]).unwrap();
    assert_eq!(reference.address_type().unwrap(), AddressType::P2wpkh);
}

#[test]
fn sh_wpkh_bip143_vector() {
    let desc = Descriptor::parse(
        "sh(wpkh(03ad1d8e89212f0b92c74d23bb710c00662ad1470198ac48c43f7d6f93a2a26873))",
    )
    .unwrap();
    assert_eq!(
        script_hex(&desc, &[]),
        "a9144733f37cf4db86fbc2efed2500b4f4e49f31202387"
    );
    let reference = desc.reference(&[]).unwrap();
    assert_eq!(reference.address_type().unwrap(), AddressType::P2shP2wpkh);
    assert_eq!(
        format!("{:x}", reference.redeem_script().unwrap()),
        "001479091972186c449eb1ded22b78e40d009bdf0089"
    );
}

#[test]
fn wsh_multi_createmultisig_vector() {
    let desc = Descriptor::parse(
        "wsh(multi(2,03789ed0bb717d88f7d321a368d905e7430207ebbd82bd342cf11ae157a7ace5fd,03dbc6764b8884a92e871274b87583e6d5c2a58819473e17e107ef3f6aa5a61626))",
    )
    .unwrap();
    let reference = desc.reference(&[]).unwrap();
    assert!(reference.locking_script().is_p2wsh());
    assert_eq!(
        format!("{:x}", reference.redeem_script().unwrap()),
        "522103789ed0bb717d88f7d321a368d905e7430207ebbd82bd342cf11ae157a7ace5fd2103dbc6764b8884a92e871274b87583e6d5c2a58819473e17e107ef3f6aa5a6162652ae"
    );
    let child = reference.child().unwrap();
    assert!(child.has_req_num());
    assert_eq!(child.req_num(), Some(2));
}

#[test]
fn pkh_wif_core_vector() {
    let desc =
        Descriptor::parse("pkh(L4rK1yDtCWekvXuE6oXD9jCYfFNV2cWRpVuPLBcCU2z8TrisoyY1)").unwrap();
    assert_eq!(
        script_hex(&desc, &[]),
        "76a914a30741f8145e5acadf23f751864167f32e0963f788ac"
    );
}

#[test]
fn combo_core_vector_order() {
    let desc =
        Descriptor::parse("combo(L4rK1yDtCWekvXuE6oXD9jCYfFNV2cWRpVuPLBcCU2z8TrisoyY1)").unwrap();
    assert!(desc.is_combo());
    assert_eq!(desc.script_type(), ScriptType::Combo);
    let scripts: Vec<String> = desc
        .locking_scripts_all(&[])
        .unwrap()
        .iter()
        .map(|s| format!("{:x}", s))
        .collect();
    assert_eq!(
        scripts,
        vec![
            "0014a30741f8145e5acadf23f751864167f32e0963f7".to_owned(),
            "a91484ab21b1b2fd065d4504ff693d832434b6108d7b87".to_owned(),
            "76a914a30741f8145e5acadf23f751864167f32e0963f788ac".to_owned(),
            "2103a34b99f22c790c4e36b2b3c2c35a36db06226e41c692fc82b8b56ac1c540c5bdac".to_owned(),
        ]
    );
}

#[test]
fn combo_uncompressed_key_emits_legacy_forms_only() {
    let desc = Descriptor::parse(
        "combo(0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8)",
    )
    .unwrap();
    let scripts = desc.locking_scripts_all(&[]).unwrap();
    assert_eq!(scripts.len(), 2);
    assert!(scripts[0].is_p2pkh());
    assert!(scripts[1].is_p2pk());
}

#[test]
fn wsh_wildcards_derive_in_order() {
    let desc = Descriptor::parse(
        "wsh(multi(2,xpub6ERApfZwUNrhLCkDtcHTcxd75RbzS1ed54G1LkBUHQVHQKqhMkhgbmJbZRkrgZw4koxb5JaHWkY4ALHY2grBGRjaDMzQLcgJvLJuZZvRcEL/0/*,xpub68NZiKmJWnxxS6aaHmn81bvJeTESw724CRDs6HbuccFQN9Ku14VQrADWgqbhhTHBaohPX4CjNLf9fq9MYo6oDaPPLPxSb7gwQN3ih19Zm4Y/1/*))",
    )
    .unwrap();
    assert_eq!(desc.need_argument_num(), 2);

    let reference = desc.reference(&["3", "5"]).unwrap();
    let keys = reference.child().unwrap().keys().to_vec();
    assert_eq!(keys.len(), 2);
    let first_path = keys[0].key_data().unwrap().full_derivation_path().to_string();
    let second_path = keys[1].key_data().unwrap().full_derivation_path().to_string();
    assert!(first_path.ends_with("0/3"), "{}", first_path);
    assert!(second_path.ends_with("1/5"), "{}", second_path);

    // Different argument order, different script.
    assert_ne!(
        desc.locking_script_with_args(&["3", "5"]).unwrap(),
        desc.locking_script_with_args(&["5", "3"]).unwrap()
    );
}

#[test]
fn taproot_key_spend_only_is_bip86_shaped() {
    let desc = Descriptor::parse(
        "tr(xpub6ERApfZwUNrhLCkDtcHTcxd75RbzS1ed54G1LkBUHQVHQKqhMkhgbmJbZRkrgZw4koxb5JaHWkY4ALHY2grBGRjaDMzQLcgJvLJuZZvRcEL/0/*)",
    )
    .unwrap();
    assert_eq!(desc.need_argument_num(), 1);
    let reference = desc.reference(&["0"]).unwrap();
    let script = reference.locking_script();
    assert!(script.is_p2tr());
    assert_eq!(script.len(), 34);
    assert_eq!(reference.address_type().unwrap(), AddressType::Taproot);
    let addr = reference.address().unwrap();
    assert!(addr.starts_with("bc1p"));
    let info = reference.tap_info().unwrap();
    assert!(info.merkle_root().is_none());
}

#[test]
fn taproot_script_tree_commits_to_leaves() {
    let desc = Descriptor::parse(
        "tr(f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9,{pk(d6889cb081036e0faefa3a35157ad71086b123b2b144b649798b494c300a961d),pk(dff1d77f2a671c5f36183726db2341be58feae1da2deced843240f7b502ba659)})",
    )
    .unwrap();
    let reference = desc.reference(&[]).unwrap();
    let info = reference.tap_info().unwrap();
    assert_eq!(info.leaf_count(), 2);
    assert!(info.merkle_root().is_some());

    // The control block of each leaf commits to the output key taken from
    // the locking script itself.
    let program = &reference.locking_script().as_bytes()[2..];
    let output_key = bitcoin::XOnlyPublicKey::from_slice(program).unwrap();
    for index in 0..2 {
        let control = info.control_block(index).unwrap();
        assert!(control.verify_taproot_commitment(
            &bitcoin::secp256k1::Secp256k1::verification_only(),
            output_key,
            info.leaf_script(index).unwrap(),
        ));
    }
}

#[test]
fn tapleaf_wrapper_is_transparent() {
    // `tl(pk(K))` and `pk(K)` leaves commit to the same scripts, so both
    // spellings yield the same output key.
    let wrapped = Descriptor::parse(
        "tr(f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9,{tl(pk(d6889cb081036e0faefa3a35157ad71086b123b2b144b649798b494c300a961d)),tl(pk(dff1d77f2a671c5f36183726db2341be58feae1da2deced843240f7b502ba659))})",
    )
    .unwrap();
    let bare = Descriptor::parse(
        "tr(f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9,{pk(d6889cb081036e0faefa3a35157ad71086b123b2b144b649798b494c300a961d),pk(dff1d77f2a671c5f36183726db2341be58feae1da2deced843240f7b502ba659)})",
    )
    .unwrap();
    assert_eq!(
        wrapped.locking_script().unwrap(),
        bare.locking_script().unwrap()
    );
    // The original tree text is preserved on re-serialization.
    assert!(wrapped
        .to_string_with_checksum(false)
        .contains("{tl(pk("));
}

#[test]
fn sortedmulti_is_permutation_invariant() {
    let a = "03789ed0bb717d88f7d321a368d905e7430207ebbd82bd342cf11ae157a7ace5fd";
    let b = "03dbc6764b8884a92e871274b87583e6d5c2a58819473e17e107ef3f6aa5a61626";
    let fwd = Descriptor::parse(&format!("sh(sortedmulti(2,{},{}))", a, b)).unwrap();
    let rev = Descriptor::parse(&format!("sh(sortedmulti(2,{},{}))", b, a)).unwrap();
    assert_eq!(
        fwd.locking_script().unwrap(),
        rev.locking_script().unwrap()
    );
}

#[test]
fn composition_violations_raise_matching_errors() {
    let key = "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5";
    let uncompressed = "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8";

    // wsh never wraps an uncompressed key.
    assert!(matches!(
        Descriptor::parse(&format!("wsh(pk({}))", uncompressed)),
        Err(Error::UncompressedInWitness)
    ));
    // pkh is forbidden under tr.
    assert!(matches!(
        Descriptor::parse(&format!(
            "tr(f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9,pkh({}))",
            key
        )),
        Err(Error::InvalidComposition(_))
    ));
    // multisig is forbidden under tr.
    assert!(matches!(
        Descriptor::parse(
            "tr(f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9,multi(1,f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9))"
        ),
        Err(Error::InvalidComposition(_))
    ));
    // combo is top-level only.
    assert!(matches!(
        Descriptor::parse(&format!("sh(combo({}))", key)),
        Err(Error::InvalidComposition(_))
    ));
    // multi key count is limited to 16 outside witness scopes.
    let many = std::iter::repeat(key).take(17).collect::<Vec<_>>().join(",");
    assert!(matches!(
        Descriptor::parse(&format!("sh(multi(1,{}))", many)),
        Err(Error::SizeExceeded { .. })
    ));
}

#[test]
fn checksum_round_trip_and_flip_detection() {
    let body = "sh(multi(2,03789ed0bb717d88f7d321a368d905e7430207ebbd82bd342cf11ae157a7ace5fd,03dbc6764b8884a92e871274b87583e6d5c2a58819473e17e107ef3f6aa5a61626))";
    let desc = Descriptor::parse(body).unwrap();
    let checksummed = desc.to_string_with_checksum(true);
    assert_eq!(Descriptor::parse(&checksummed).unwrap().to_string_with_checksum(false), body);

    // Flipping a payload character is caught by the checksum.
    let flipped = checksummed.replace("multi(2", "multi(1");
    assert!(matches!(
        Descriptor::parse(&flipped),
        Err(Error::ChecksumMismatch { .. })
    ));
}

#[test]
fn raw_and_addr_descriptors() {
    let desc = Descriptor::parse("raw(deadbeef)#89f8spxm").unwrap();
    assert_eq!(script_hex(&desc, &[]), "deadbeef");
    let reference = desc.reference(&[]).unwrap();
    assert!(!reference.has_address());
    assert!(reference.address().is_err());

    // A raw p2pkh script is addressable.
    let desc = Descriptor::parse("raw(76a914a30741f8145e5acadf23f751864167f32e0963f788ac)").unwrap();
    let reference = desc.reference(&[]).unwrap();
    assert_eq!(reference.address_type().unwrap(), AddressType::P2pkh);

    let addr = reference.address().unwrap();
    let round = Descriptor::parse(&format!("addr({})", addr)).unwrap();
    assert_eq!(
        round.locking_script().unwrap(),
        bitcoin::ScriptBuf::from(
            Vec::<u8>::from_hex("76a914a30741f8145e5acadf23f751864167f32e0963f788ac").unwrap()
        )
    );

    // Addresses for another network are rejected by the prefix table.
    assert!(matches!(
        Descriptor::parse_elements(&format!("addr({})", addr)),
        Err(Error::Address(_))
    ));
}

#[test]
fn miniscript_fragments_compile_inside_wsh() {
    let desc = Descriptor::parse(
        "wsh(and_v(v:pk(02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5),older(144)))",
    )
    .unwrap();
    let reference = desc.reference(&[]).unwrap();
    assert!(reference.locking_script().is_p2wsh());
    let redeem = reference.redeem_script().unwrap();
    assert!(!redeem.is_empty());

    // Unknown fragments outside script-hash scopes stay unknown operators.
    assert!(matches!(
        Descriptor::parse("and_v(v:pk(02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5),older(144))"),
        Err(Error::UnknownOperator(_))
    ));
}

#[test]
fn create_descriptor_enforces_the_same_rules() {
    let keys = vec![
        "03789ed0bb717d88f7d321a368d905e7430207ebbd82bd342cf11ae157a7ace5fd".to_owned(),
        "03dbc6764b8884a92e871274b87583e6d5c2a58819473e17e107ef3f6aa5a61626".to_owned(),
    ];
    let desc = Descriptor::create(
        &[ScriptType::Wsh, ScriptType::Multi],
        &keys,
        2,
        AddressParams::BITCOIN,
    )
    .unwrap();
    assert_eq!(desc.script_type(), ScriptType::Wsh);
    assert_eq!(
        format!("{:x}", desc.reference(&[]).unwrap().redeem_script().unwrap()),
        "522103789ed0bb717d88f7d321a368d905e7430207ebbd82bd342cf11ae157a7ace5fd2103dbc6764b8884a92e871274b87583e6d5c2a58819473e17e107ef3f6aa5a6162652ae"
    );

    // Wrap order is outermost-first; a bare inner wrap is rejected.
    assert!(Descriptor::create(&[ScriptType::Wsh], &[], 0, AddressParams::BITCOIN).is_err());
}
