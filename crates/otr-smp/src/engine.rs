//! The SMP engine: builds and validates the four SMP messages, driving
//! the `SmpState` transitions from the SMP state table.

use num_bigint::BigUint;
use otr_crypto::dh::{check_group_element, generator, modexp_secret, prime};
use otr_crypto::secret::SecretExponent;
use otr_proto::smp_messages::{smp_abort_tlv, Smp1, Smp2, Smp3, Smp4, Tlv};
use rand_core::{CryptoRng, RngCore};

use crate::error::SmpError;
use crate::math::{
    group_elements_eq, inverse, prove_coords, prove_equal_logs, prove_log, random_exponent, verify_coords,
    verify_equal_logs, verify_log, CoordProof, EqualLogsProof, LogProof,
};
use crate::state::SmpState;

/// What an SMP step produced.
pub enum SmpOutput {
    /// Input was not actionable in the current state; per the table,
    /// this resets to `Expect1` with no outgoing message (e.g. a
    /// received Abort).
    Nothing,
    /// Bytes to send, no completion yet.
    Send(Tlv),
    /// A validation failure: an Abort TLV must be sent and the protocol
    /// has failed (distinct from a clean `succeeded = false`, which is
    /// a legitimate mismatched-secret outcome).
    Aborted { reply: Tlv },
    /// The protocol ran to completion. `reply` carries SMP4 when this
    /// side is the responder finishing on receipt of SMP3, or `None`
    /// when this side is the initiator finishing on receipt of SMP4.
    Finished { reply: Option<Tlv>, succeeded: bool },
}

fn group_ok(values: &[&BigUint]) -> bool {
    values.iter().all(|v| check_group_element(v).is_ok())
}

fn mul_mod_p(a: &BigUint, b: &BigUint) -> BigUint {
    (a * b) % prime()
}

/// Start SMP as the initiator: generate `a2`, `a3`, and the SMP1 body.
pub fn start(
    state: &mut SmpState,
    rng: &mut (impl RngCore + CryptoRng),
    x: BigUint,
    question: Option<String>,
) -> Tlv {
    let a2 = random_exponent(rng);
    let a3 = random_exponent(rng);
    let g2a = modexp_secret(&generator(), &a2);
    let g3a = modexp_secret(&generator(), &a3);

    let log2 = prove_log(rng, 1, &generator(), &a2);
    let log3 = prove_log(rng, 2, &generator(), &a3);

    let tlv = Smp1 {
        question,
        g2a,
        c2: log2.c,
        d2: log2.d,
        g3a,
        c3: log3.c,
        d3: log3.d,
    }
    .encode();

    *state = SmpState::Expect2 {
        x: SecretExponent::new(x),
        a2: SecretExponent::new(a2),
        a3: SecretExponent::new(a3),
    };
    tracing::debug!(target: "otr_smp", event = "smp_transition", to = "Expect2");
    tlv
}

/// Receive SMP1 as the responder: only valid from `Expect1`. `x` is the
/// low-entropy secret the local user supplied for this comparison,
/// derived the same way as the initiator's.
pub fn receive_smp1(
    state: &mut SmpState,
    tlv: &Tlv,
    rng: &mut (impl RngCore + CryptoRng),
    x: BigUint,
) -> Result<SmpOutput, SmpError> {
    if !state.is_idle() {
        *state = SmpState::Expect1;
        tracing::debug!(target: "otr_smp", event = "smp_aborted", reason = "smp1_while_busy");
        return Ok(SmpOutput::Aborted { reply: smp_abort_tlv() });
    }

    let msg = Smp1::parse(tlv)?;
    if !group_ok(&[&msg.g2a, &msg.g3a])
        || !verify_log(1, &generator(), &msg.g2a, &LogProof { c: msg.c2, d: msg.d2 })
        || !verify_log(2, &generator(), &msg.g3a, &LogProof { c: msg.c3, d: msg.d3 })
    {
        tracing::debug!(target: "otr_smp", event = "smp_aborted", reason = "smp1_proof_failed");
        return Ok(SmpOutput::Aborted { reply: smp_abort_tlv() });
    }

    let b2 = SecretExponent::new(random_exponent(rng));
    let b3 = random_exponent(rng);
    let g2b = modexp_secret(&generator(), &b2.value());
    let g3b = modexp_secret(&generator(), &b3);
    let log2b = prove_log(rng, 3, &generator(), &b2.value());
    let log3b = prove_log(rng, 4, &generator(), &b3);

    let g2 = modexp_secret(&msg.g2a, &b2.value());
    let g3 = modexp_secret(&msg.g3a, &b3);

    let r4 = SecretExponent::new(random_exponent(rng));
    let pb = modexp_secret(&g3, &r4.value());
    let qb = mul_mod_p(&modexp_secret(&generator(), &r4.value()), &modexp_secret(&g2, &x));
    let coord = prove_coords(rng, 5, &g2, &g3, &r4.value(), &x);

    let out = Smp2 {
        g2b,
        c2: log2b.c,
        d2: log2b.d,
        g3b,
        c3: log3b.c,
        d3: log3b.d,
        pb: pb.clone(),
        qb: qb.clone(),
        cp: coord.cp,
        d5: coord.d5,
        d6: coord.d6,
    }
    .encode();

    *state = SmpState::Expect3 { b3: SecretExponent::new(b3), g2, g3, g3a: msg.g3a, pb, qb };
    tracing::debug!(target: "otr_smp", event = "smp_transition", to = "Expect3");
    Ok(SmpOutput::Send(out))
}

/// Receive SMP2 as the initiator: only valid from `Expect2`.
pub fn receive_smp2(
    state: &mut SmpState,
    tlv: &Tlv,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<SmpOutput, SmpError> {
    if !matches!(state, SmpState::Expect2 { .. }) {
        *state = SmpState::Expect1;
        tracing::debug!(target: "otr_smp", event = "smp_aborted", reason = "smp2_while_not_expected");
        return Ok(SmpOutput::Aborted { reply: smp_abort_tlv() });
    }
    let SmpState::Expect2 { x, a2, a3 } = std::mem::take(state) else {
        unreachable!("guarded above")
    };

    let msg = Smp2::parse(tlv)?;
    if !group_ok(&[&msg.g2b, &msg.g3b, &msg.pb, &msg.qb])
        || !verify_log(3, &generator(), &msg.g2b, &LogProof { c: msg.c2, d: msg.d2 })
        || !verify_log(4, &generator(), &msg.g3b, &LogProof { c: msg.c3, d: msg.d3 })
    {
        tracing::debug!(target: "otr_smp", event = "smp_aborted", reason = "smp2_proof_failed");
        return Ok(SmpOutput::Aborted { reply: smp_abort_tlv() });
    }

    let g2 = modexp_secret(&msg.g2b, &a2.value());
    let g3 = modexp_secret(&msg.g3b, &a3.value());

    if !verify_coords(5, &g2, &g3, &msg.pb, &msg.qb, &CoordProof { cp: msg.cp, d5: msg.d5, d6: msg.d6 }) {
        tracing::debug!(target: "otr_smp", event = "smp_aborted", reason = "smp2_coords_failed");
        return Ok(SmpOutput::Aborted { reply: smp_abort_tlv() });
    }

    let r4 = SecretExponent::new(random_exponent(rng));
    let pa = modexp_secret(&g3, &r4.value());
    let qa = mul_mod_p(&modexp_secret(&generator(), &r4.value()), &modexp_secret(&g2, &x.value()));
    let coord = prove_coords(rng, 6, &g2, &g3, &r4.value(), &x.value());

    let qaqb = mul_mod_p(&qa, &inverse(&msg.qb));
    let ra = modexp_secret(&qaqb, &a3.value());
    let eq = prove_equal_logs(rng, 7, &qaqb, &a3.value());

    let out = Smp3 {
        pa: pa.clone(),
        qa,
        cp: coord.cp,
        d5: coord.d5,
        d6: coord.d6,
        ra,
        cr: eq.cr,
        d7: eq.d7,
    }
    .encode();

    *state = SmpState::Expect4 { a3, pa, pb: msg.pb, g3b: msg.g3b, qaqb };
    tracing::debug!(target: "otr_smp", event = "smp_transition", to = "Expect4");
    Ok(SmpOutput::Send(out))
}

/// Receive SMP3 as the responder: only valid from `Expect3`. Determines
/// `succeeded` and always resets to `Expect1` afterward, win or lose.
pub fn receive_smp3(
    state: &mut SmpState,
    tlv: &Tlv,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<SmpOutput, SmpError> {
    if !matches!(state, SmpState::Expect3 { .. }) {
        *state = SmpState::Expect1;
        tracing::debug!(target: "otr_smp", event = "smp_aborted", reason = "smp3_while_not_expected");
        return Ok(SmpOutput::Aborted { reply: smp_abort_tlv() });
    }
    let SmpState::Expect3 { b3, g2, g3, g3a, pb, qb } = std::mem::take(state) else {
        unreachable!("guarded above")
    };

    let msg = Smp3::parse(tlv)?;
    if !group_ok(&[&msg.pa, &msg.qa, &msg.ra]) {
        tracing::debug!(target: "otr_smp", event = "smp_aborted", reason = "smp3_group_check_failed");
        return Ok(SmpOutput::Aborted { reply: smp_abort_tlv() });
    }
    if !verify_coords(6, &g2, &g3, &msg.pa, &msg.qa, &CoordProof { cp: msg.cp, d5: msg.d5, d6: msg.d6 }) {
        tracing::debug!(target: "otr_smp", event = "smp_aborted", reason = "smp3_coords_failed");
        return Ok(SmpOutput::Aborted { reply: smp_abort_tlv() });
    }

    let qaqb = mul_mod_p(&msg.qa, &inverse(&qb));
    if !verify_equal_logs(7, &g3a, &qaqb, &msg.ra, &EqualLogsProof { cr: msg.cr, d7: msg.d7 }) {
        tracing::debug!(target: "otr_smp", event = "smp_aborted", reason = "smp3_equal_logs_failed");
        return Ok(SmpOutput::Aborted { reply: smp_abort_tlv() });
    }

    let rab = modexp_secret(&msg.ra, &b3.value());
    let expected = mul_mod_p(&msg.pa, &inverse(&pb));
    let succeeded = group_elements_eq(&rab, &expected);

    let rb = modexp_secret(&qaqb, &b3.value());
    let eq_out = prove_equal_logs(rng, 8, &qaqb, &b3.value());
    let out = Smp4 { rb, cr: eq_out.cr, d7: eq_out.d7 }.encode();

    tracing::debug!(target: "otr_smp", event = "smp_finished", role = "responder", succeeded);
    Ok(SmpOutput::Finished { reply: Some(out), succeeded })
}

/// Receive SMP4 as the initiator: only valid from `Expect4`. Determines
/// `succeeded` with no further reply.
pub fn receive_smp4(state: &mut SmpState, tlv: &Tlv) -> Result<SmpOutput, SmpError> {
    if !matches!(state, SmpState::Expect4 { .. }) {
        *state = SmpState::Expect1;
        tracing::debug!(target: "otr_smp", event = "smp_aborted", reason = "smp4_while_not_expected");
        return Ok(SmpOutput::Aborted { reply: smp_abort_tlv() });
    }
    let SmpState::Expect4 { a3, pa, pb, g3b, qaqb } = std::mem::take(state) else {
        unreachable!("guarded above")
    };

    let msg = Smp4::parse(tlv)?;
    if check_group_element(&msg.rb).is_err()
        || !verify_equal_logs(8, &g3b, &qaqb, &msg.rb, &EqualLogsProof { cr: msg.cr, d7: msg.d7 })
    {
        tracing::debug!(target: "otr_smp", event = "smp_aborted", reason = "smp4_equal_logs_failed");
        return Ok(SmpOutput::Aborted { reply: smp_abort_tlv() });
    }

    let rab = modexp_secret(&msg.rb, &a3.value());
    let expected = mul_mod_p(&pa, &inverse(&pb));
    let succeeded = group_elements_eq(&rab, &expected);

    tracing::debug!(target: "otr_smp", event = "smp_finished", role = "initiator", succeeded);
    Ok(SmpOutput::Finished { reply: None, succeeded })
}

/// A received SMP-Abort always resets to `Expect1` with no outgoing
/// message, regardless of the current state.
pub fn receive_abort(state: &mut SmpState) -> SmpOutput {
    *state = SmpState::Expect1;
    tracing::debug!(target: "otr_smp", event = "smp_transition", to = "Expect1", reason = "received_abort");
    SmpOutput::Nothing
}

/// The local user cancelled SMP: reset and hand back an Abort TLV to send.
pub fn abort(state: &mut SmpState) -> Tlv {
    *state = SmpState::Expect1;
    tracing::debug!(target: "otr_smp", event = "smp_transition", to = "Expect1", reason = "local_cancel");
    smp_abort_tlv()
}
