// crates/rtb-hooks-core/src/runtime/activity.rs
// ============================================================================
// Module: RTB Hooks Activity Restrictions
// Description: Privacy scrubbing of a hook's own payload copy.
// Purpose: Withhold user first-party data from restricted modules.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Before a hook is invoked, the activity policy is asked whether its module
//! may receive user first-party data. When it may not, that hook's private
//! payload copy is scrubbed. Sibling hooks and the payload threaded through
//! the stage are unaffected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::StagePayload;
use crate::core::ortb::BidRequest;
use crate::interfaces::ActivityControl;
use crate::interfaces::Component;
use crate::interfaces::PrivacyActivity;

// ============================================================================
// SECTION: Restrictions
// ============================================================================

/// Applies activity restrictions for `module_code` to a hook's payload copy.
#[must_use]
pub fn restrict_payload<P: StagePayload>(
    control: Option<&dyn ActivityControl>,
    module_code: &str,
    mut payload: P,
) -> P {
    let Some(control) = control else {
        return payload;
    };
    if control.allow(PrivacyActivity::TransmitUserFpd, &Component::module(module_code)) {
        return payload;
    }
    if let Some(request) = payload.bid_request_mut() {
        scrub_user_fpd(request);
    }
    payload
}

/// Removes user first-party data from a bid request.
pub fn scrub_user_fpd(request: &mut BidRequest) {
    let Some(user) = request.user.as_mut() else {
        return;
    };
    user.id = None;
    user.buyeruid = None;
    user.yob = None;
    user.gender = None;
    user.data = None;
    user.eids = None;
    if let Some(ext) = user.ext.as_mut().and_then(|ext| ext.as_object_mut()) {
        ext.remove("data");
    }
}
