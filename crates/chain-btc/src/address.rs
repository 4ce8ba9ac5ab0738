use bitcoin::address::Address;
use bitcoin::Script;

use crate::error::BtcError;
use crate::network::BtcNetwork;
use crate::script::WitnessProgram;

/// Render a witness program as its bech32/bech32m address.
pub fn witness_program_address(
    program: &WitnessProgram,
    network: BtcNetwork,
) -> Result<String, BtcError> {
    let script_pubkey = program.script_pubkey();
    let address = Address::from_script(
        Script::from_bytes(&script_pubkey),
        network.to_bitcoin_network(),
    )
    .map_err(|e| BtcError::InvalidAddress(format!("no address form for script: {e}")))?;

    Ok(address.to_string())
}
