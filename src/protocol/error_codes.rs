//! Meanings of the opaque `err-N` codes reported by the gateway.
//!
//! Only used to make log lines readable; never drives control flow.

/// Returned for codes missing from the table.
pub const UNKNOWN_ERROR: &str = "Default unknown error";

const ERROR_CODES: &[(&str, &str)] = &[
    ("err-8", "Operator determined barring. This cause indicates that the MS has tried to send a mobile originating short message when the MS's network operator or service provider has forbidden such transactions."),
    ("err-10", "Call barred. This cause indicates that the outgoing call barred service applies to the short message service for the called destination."),
    ("err-21", "Short message transfer rejected. This cause indicates that the equipment sending this cause does not wish to accept this short message, although it could have accepted the short message since the equipment sending this cause is neither busy nor incompatible."),
    ("err-27", "Destination out of service. This cause indicates that the destination indicated by the Mobile Station cannot be reached because the interface to the destination is not functioning correctly. The term \"not functioning correctly\" indicates that a signaling message was unable to be delivered to the remote user e.g., a physical layer or data link layer failure at the remote user, user equipment off-line, etc."),
    ("err-28", "Unidentified subscriber. This cause indicates that the subscriber is not registered in the PLMN (i.e. IMSI not known)."),
    ("err-29", "Facility rejected. This cause indicates that the facility requested by the Mobile Station is not supported by the PLMN."),
    ("err-30", "Unknown subscriber. This cause indicates that the subscriber is not registered in the HLR (i.e. IMSI or directory number is not allocated to a subscriber)."),
    ("err-31", "Normal unspecified. The GSM engine refused to send the message but no reason was stated. Note that this can also be the result of a message that was recently sent to the card, before a reply was received for the previous message."),
    ("err-34", "Module Error. Module either has no SIM, no reception, is faulty or is still handling the sending of a previous message."),
    ("err-38", "Network out of order. This cause indicates that the network is not functioning correctly and that the condition is likely to last a relatively long period of time e.g., immediately reattempting the short message transfer is not likely to be successful."),
    ("err-41", "Temporary failure. This cause indicates that the network is not functioning correctly and that the condition is not likely to last a long period of time e.g., the Mobile Station may wish to try another short message transfer attempt almost immediately."),
    ("err-42", "Congestion. This cause indicates that the short message service cannot be serviced because of high traffic."),
    ("err-47", "Resources unavailable, unspecified. This cause is used to report a resource unavailable event only when no other cause applies."),
    ("err-50", "Requested facility not subscribed. This cause indicates that the requested short message service could not be provided by the network because the user has not completed the necessary administrative arrangements with its supporting networks."),
    ("err-69", "Requested facility not implemented. This cause indicates that the network is unable to provide the requested short message service."),
    ("err-81", "Invalid short message transfer reference value. This cause indicates that the equipment sending this cause has received a message with a short message reference which is not currently in use on the MS-network interface."),
    ("err-95", "Invalid message, unspecified. This cause is used to report an invalid message event only when no other cause in the invalid message class applies."),
    ("err-96", "Invalid mandatory information. This cause indicates that the equipment sending this cause has received a message where a mandatory information element is missing and/or has a content error (the two cases are indistinguishable)."),
    ("err-97", "Message type non-existent or not implemented. This cause indicates that the equipment sending this cause has received a message with a message type it does not recognize either because this is a message not defined or defined but not implemented by the equipment sending this cause."),
    ("err-98", "Message not compatible with short message protocol state. This cause indicates that the equipment sending this cause has received a message such that the procedures do not indicate that this is a permissible message to receive while in the short message transfer state."),
    ("err-99", "Information element non-existent or not implemented. This cause indicates that the equipment sending this cause has received a message which includes information elements not recognized because the information element identifier is not defined or it is defined but not implemented by the equipment sending the cause. However, the information element is not required to be present in the message in order for the equipment sending the cause to process the message."),
    ("err-102", "Timer expiry. Sending failed due to a timeout, and during this time the GSM network didn't return any specific error code."),
    ("err-111", "Protocol error, unspecified. This cause is used to report a protocol error event only when no other cause applies."),
    ("err-127", "Interworking, unspecified. This cause indicates that there has been interworking with a network which does not provide causes for actions it takes thus, the precise cause for a message which is being sent cannot be ascertained."),
    ("err-128", "Telematic interworking not supported"),
    ("err-129", "Short message Type 0 not supported"),
    ("err-130", "Cannot replace short message"),
    ("err-143", "Unspecified TP-PID error"),
    ("err-144", "Data coding scheme (alphabet) not supported"),
    ("err-145", "Message class not supported"),
    ("err-159", "Unspecified TP-DCS error"),
    ("err-160", "Command cannot be auctioned"),
    ("err-161", "Command unsupported"),
    ("err-175", "Unspecified TP-Command error"),
    ("err-176", "TPDU not supported"),
    ("err-192", "SC busy"),
    ("err-193", "No SC subscription"),
    ("err-194", "SC system failure"),
    ("err-195", "Invalid SME address"),
    ("err-196", "Destination SME barred"),
    ("err-197", "SM Rejected-Duplicate SM"),
    ("err-198", "TP-VPF not supported"),
    ("err-199", "TP-VP not supported"),
    ("err-208", "D0 SIM SMS storage full"),
    ("err-209", "No SMS storage capability in SIM"),
    ("err-210", "Error in MS"),
    ("err-211", "Memory Capacity Exceeded"),
    ("err-212", "SIM Application Toolkit Busy"),
    ("err-213", "SIM data download error"),
    ("err-224", "Card reply timeout error"),
    ("err-225", "SIM reply timeout error"),
    ("err-226", "Missing SIM"),
    ("err-255", "Unspecified error cause"),
    ("err-300", "ME failure"),
    ("err-301", "SMS service of ME reserved"),
    ("err-302", "Operation not allowed"),
    ("err-303", "Operation not supported"),
    ("err-304", "Invalid PDU mode parameter"),
    ("err-305", "Invalid text mode parameter"),
    ("err-310", "SIM not inserted"),
    ("err-311", "SIM PIN required"),
    ("err-312", "PH-SIM PIN required"),
    ("err-313", "SIM failure"),
    ("err-314", "SIM busy"),
    ("err-315", "SIM wrong"),
    ("err-316", "SIM PUK required"),
    ("err-317", "SIM PIN2 required"),
    ("err-318", "SIM PUK2 required"),
    ("err-320", "Memory failure"),
    ("err-321", "Invalid memory index"),
    ("err-322", "Memory full"),
    ("err-330", "SMSC address unknown"),
    ("err-331", "No network service"),
    ("err-332", "Network timeout"),
    ("err-340", "NO +CNMA ACK EXPECTED"),
    ("err-500", "Unknown error"),
    ("err-512", "MM establishment failure"),
    ("err-513", "Lower layer failure"),
    ("err-514", "CP error"),
];

/// Human readable explanation of a gateway error code.
pub fn error_code_meaning(code: &str) -> &'static str {
    ERROR_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, meaning)| *meaning)
        .unwrap_or(UNKNOWN_ERROR)
}
